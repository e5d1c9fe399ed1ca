//! Falcon Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("FALCON_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("FALCON_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "FALCON_PORT".to_string(),
                value: port,
            })?;
        }

        // CORS origins (comma-separated)
        if let Ok(origins) = std::env::var("FALCON_CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // SQLite
        if let Ok(path) = std::env::var("FALCON_DB_PATH") {
            config.database.path = path;
        }

        // Auth
        if let Ok(secret) = std::env::var("FALCON_JWT_SECRET") {
            config.auth.jwt_secret = Some(secret);
        }
        if let Ok(email) = std::env::var("FALCON_ADMIN_EMAIL") {
            config.auth.admin_email = email;
        }
        if let Ok(password) = std::env::var("FALCON_ADMIN_PASSWORD") {
            config.auth.admin_password = Some(password);
        }

        // Logging
        if let Ok(level) = std::env::var("FALCON_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins; empty means allow any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3232,
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
    /// Maximum connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "database/falcon_auth.db".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

/// Sliding-window rate limit settings for one guarded operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum admitted requests inside the window
    pub max_requests: usize,
    /// Window length in seconds
    pub window_seconds: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret; generated per process when absent
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Access token validity in minutes
    pub access_token_ttl_mins: u64,

    /// Refresh token validity in days
    pub refresh_token_ttl_days: u64,

    /// Password reset token validity in minutes
    pub reset_token_ttl_mins: u64,

    /// Rate limit for login attempts
    pub login_limit: RateLimitSettings,

    /// Rate limit for registrations
    pub register_limit: RateLimitSettings,

    /// Email of the bootstrap admin account
    pub admin_email: String,

    /// Bootstrap admin password; generated at first bootstrap when absent
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_mins: 30,
            refresh_token_ttl_days: 30,
            reset_token_ttl_mins: 60,
            login_limit: RateLimitSettings {
                max_requests: 5,
                window_seconds: 60,
            },
            register_limit: RateLimitSettings {
                max_requests: 3,
                window_seconds: 60,
            },
            admin_email: "admin@example.com".to_string(),
            admin_password: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3232);
        assert_eq!(config.database.path, "database/falcon_auth.db");
        assert_eq!(config.auth.access_token_ttl_mins, 30);
        assert_eq!(config.auth.refresh_token_ttl_days, 30);
        assert_eq!(config.auth.login_limit.max_requests, 5);
        assert_eq!(config.auth.register_limit.max_requests, 3);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [database]
            path = "/tmp/falcon.db"

            [auth]
            access_token_ttl_mins = 15
            refresh_token_ttl_days = 7
            reset_token_ttl_mins = 30
            admin_email = "root@example.com"
            login_limit = { max_requests = 10, window_seconds = 120 }
            register_limit = { max_requests = 2, window_seconds = 60 }

            [logging]
            level = "debug"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "/tmp/falcon.db");
        assert_eq!(config.auth.access_token_ttl_mins, 15);
        assert_eq!(config.auth.login_limit.max_requests, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file("/nonexistent/falcon.toml");
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }
}
