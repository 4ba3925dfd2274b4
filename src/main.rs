use std::error::Error;

use sqlx::postgres::PgPoolOptions;
use tokio::signal::ctrl_c;
use tracing_subscriber::{fmt, EnvFilter};
use warp::Filter;

use foodgram::{
    actions::prepare_db,
    filters::{api, Context},
    jwt::SessionKey,
    Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    log::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    prepare_db(&pool).await?;

    let key = SessionKey::new(config.secret_key.as_bytes(), config.session_hours);
    let ctx = Context::new(pool, key, &config.public_url);
    let routes = api(ctx).with(warp::log("foodgram"));

    let (address, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(config.address(), async {
            if ctrl_c().await.is_ok() {
                log::info!("Received Ctrl+C, shutting down");
            }
        })?;

    log::info!("Server running on {address}");
    server.await;

    log::info!("Server shut down");
    Ok(())
}
