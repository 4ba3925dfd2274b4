mod ingredients;
mod recipes;
mod relations;
mod shopping_cart;
mod subscriptions;
mod tags;
mod users;

pub use ingredients::*;
pub use recipes::*;
pub use relations::*;
pub use shopping_cart::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

use sqlx::{Executor, Pool, Postgres};

use crate::error::QueryError;

/// Creates the enums, tables and indexes the API runs on. Safe to run on
/// every start.
pub async fn prepare_db(pool: &Pool<Postgres>) -> Result<(), crate::error::Error> {
    pool.execute(include_str!("sql/schema.sql"))
        .await
        .map_err(QueryError::from)?;

    log::info!("Database schema is up to date");
    Ok(())
}
