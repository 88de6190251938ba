use std::env;

use crate::qr::detect_base_url;

/// Runtime settings, read from the environment (and `.env`).
///
/// | Variable | Default |
/// |----------|---------|
/// | DATABASE_URL | required |
/// | HTTP_HOST | 0.0.0.0 |
/// | HTTP_PORT | 8000 |
/// | PUBLIC_BASE_URL | detected local address |
/// | DB_MAX_CONNECTIONS | 5 |
/// | LOG_LEVEL | info |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub http_host: String,
    pub http_port: u16,
    pub public_base_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            database_url: non_empty("DATABASE_URL"),
            http_host: non_empty("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            http_port: non_empty("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            public_base_url: non_empty("PUBLIC_BASE_URL"),
            db_max_connections: non_empty("DB_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        }
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    /// Base URL embedded in QR artifacts.
    pub fn qr_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| detect_base_url(self.http_port))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
