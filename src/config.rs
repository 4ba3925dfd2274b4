use std::{
    env,
    fmt::{self, Display},
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use rand::{distributions::Alphanumeric, Rng};

#[derive(Debug)]
pub struct ConfigError {
    key: &'static str,
    info: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration for {}: {}", self.key, self.info)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub secret_key: String,
    pub public_url: String,
    pub max_connections: u32,
    pub session_hours: i64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError {
                key: "DATABASE_URL",
                info: String::from("not set"),
            })?,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "8000")?,
            secret_key: load_secret("SECRET_KEY"),
            public_url: try_load::<String>("PUBLIC_URL", "http://localhost:8000")?
                .trim_end_matches('/')
                .to_string(),
            max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            session_hours: try_load("SESSION_HOURS", "24")?,
        })
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError {
            key,
            info: e.to_string(),
        })
}

fn load_secret(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        log::warn!("{key} not set, generating a random key; sessions will not survive a restart");
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let port: u16 = try_load("FOODGRAM_TEST_UNSET_PORT", "8000").unwrap();
        assert_eq!(port, 8000);
        let host: IpAddr = try_load("FOODGRAM_TEST_UNSET_HOST", "0.0.0.0").unwrap();
        assert!(host.is_unspecified());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let error = try_load::<u16>("FOODGRAM_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(error.to_string().contains("FOODGRAM_TEST_UNSET_PORT"));
    }

    #[test]
    fn generated_secrets_are_random() {
        let a = load_secret("FOODGRAM_TEST_UNSET_SECRET");
        let b = load_secret("FOODGRAM_TEST_UNSET_SECRET");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
