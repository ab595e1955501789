//! Runtime configuration read from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Signing secret used when no database is configured (local development only).
pub const DEV_JWT_SECRET: &str = "salonbook-dev-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SALONBOOK_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("DATABASE_URL is set but JWT_SECRET is not; refusing to start with the development secret")]
    MissingJwtSecret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// `None` runs on in-memory stores.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// - SALONBOOK_BIND: socket address (default 0.0.0.0:8080)
    /// - DATABASE_URL: Postgres URL (optional; in-memory stores when absent)
    /// - DATABASE_MAX_CONNECTIONS: pool size (default 10)
    /// - JWT_SECRET: HS256 signing secret (required with DATABASE_URL)
    /// - SESSION_TTL_MINUTES: session lifetime (default 720)
    /// - CACHE_TTL_SECONDS: cached read lifetime (default 30; 0 disables)
    /// - CACHE_CAPACITY: max cached responses (default 1024; 0 disables)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_str = var("SALONBOOK_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind: SocketAddr = bind_str.parse().map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let number = |name: &'static str, default: u64, allow_zero: bool| -> Result<u64, ConfigError> {
            match var(name) {
                None => Ok(default),
                Some(raw) => match raw.parse::<u64>() {
                    Ok(n) if n > 0 || allow_zero => Ok(n),
                    _ => Err(ConfigError::InvalidNumber { name, value: raw }),
                },
            }
        };

        let database_url = var("DATABASE_URL");
        let database_max_connections = number("DATABASE_MAX_CONNECTIONS", 10, false)? as u32;
        let session_minutes = number("SESSION_TTL_MINUTES", 720, false)?;
        let cache_ttl = Duration::from_secs(number("CACHE_TTL_SECONDS", 30, true)?);
        let cache_capacity = number("CACHE_CAPACITY", 1024, true)? as usize;

        let jwt_secret = match (var("JWT_SECRET"), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => return Err(ConfigError::MissingJwtSecret),
            (None, None) => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            bind,
            database_url,
            database_max_connections,
            jwt_secret,
            session_ttl: chrono::Duration::minutes(session_minutes.min(i64::MAX as u64 / 60_000) as i64),
            cache_ttl,
            cache_capacity,
        })
    }

    /// Configuration for tests and local runs: in-memory stores, dev secret.
    pub fn in_memory() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            database_max_connections: 1,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl: chrono::Duration::minutes(720),
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 1024,
        }
    }
}
