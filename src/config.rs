use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

const DEV_JWT_SECRET: &str = "money-trail-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// When unset the server falls back to the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let listen_addr = parse_var("LISTEN_ADDR", "127.0.0.1:5000")?;
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", "5")?;
        let jwt_ttl_secs: u64 = parse_var("JWT_TTL_SECS", "604800")?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();


        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_ttl: Duration::from_secs(jwt_ttl_secs),
            cors_allow_origins,
        })
    }

    /// Settings for tests and local tooling: in-memory store, fixed secret.
    pub fn for_tests() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            database_max_connections: 1,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: Duration::from_secs(3600),
            cors_allow_origins: vec!["*".to_string()],
        }
    }
}

/// `LOG_FORMAT=json` switches log output to JSON lines. Read on its own so
/// tracing can be initialised before the rest of the configuration.
pub fn log_json_from_env() -> bool {
    env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn parse_var<T>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}
