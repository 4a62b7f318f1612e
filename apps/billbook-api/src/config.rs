//! Server configuration.
//!
//! Loaded from `BILLBOOK_*` environment variables with fallback to defaults.
//! A `.env` file is read first by the binary (see `main.rs`).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use billbook_core::{ReturnPolicy, DEFAULT_RETURN_WINDOW_DAYS};
use billbook_db::DbConfig;

/// Billbook API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Maximum pooled SQLite connections
    pub max_connections: u32,

    /// HS256 secret shared with the identity issuer
    pub jwt_secret: String,

    /// Lifetime of tokens minted by [`crate::auth::JwtManager::issue`]
    pub jwt_expiration_secs: i64,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Days after the bill date during which returns and exchanges are
    /// accepted. 0 disables the limit.
    pub return_window_days: u32,

    /// Admin created on first start when the directory has none
    pub default_admin_username: String,
    pub default_admin_email: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            host: env::var("BILLBOOK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("BILLBOOK_PORT", "8080")?,
            database_path: env::var("BILLBOOK_DATABASE_PATH")
                .unwrap_or_else(|_| "./billbook.db".to_string()),
            max_connections: parse_var("BILLBOOK_MAX_CONNECTIONS", "5")?,
            jwt_secret: env::var("BILLBOOK_JWT_SECRET")
                // Must be overridden outside development
                .unwrap_or_else(|_| "billbook-dev-secret-change-in-production".to_string()),
            jwt_expiration_secs: parse_var("BILLBOOK_JWT_EXPIRATION_SECS", "3600")?,
            log_level: env::var("BILLBOOK_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            return_window_days: parse_var(
                "BILLBOOK_RETURN_WINDOW_DAYS",
                &DEFAULT_RETURN_WINDOW_DAYS.to_string(),
            )?,
            default_admin_username: env::var("BILLBOOK_DEFAULT_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            default_admin_email: env::var("BILLBOOK_DEFAULT_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@billbook.local".to_string()),
        };

        if config.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("BILLBOOK_JWT_SECRET".to_string()));
        }
        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("BILLBOOK_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Address the server binds to.
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BILLBOOK_HOST".to_string()))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn return_policy(&self) -> ReturnPolicy {
        ReturnPolicy::new(self.return_window_days)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "./billbook.db".to_string(),
            max_connections: 5,
            jwt_secret: "billbook-dev-secret-change-in-production".to_string(),
            jwt_expiration_secs: 3600,
            log_level: "info".to_string(),
            return_window_days: DEFAULT_RETURN_WINDOW_DAYS,
            default_admin_username: "admin".to_string(),
            default_admin_email: "admin@billbook.local".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
