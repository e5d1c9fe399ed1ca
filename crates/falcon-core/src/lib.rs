//! Falcon Core - Shared types for the Falcon auth service
//!
//! This crate defines the abstractions used throughout the Falcon system:
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, RateLimitSettings};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Falcon operations
#[derive(Error, Debug)]
pub enum FalconError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FalconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_no_secrets() {
        let err = FalconError::InvalidCredentials;
        assert_eq!(err.to_string(), "Incorrect username or password");

        let err = FalconError::NotFound("user".to_string());
        assert_eq!(err.to_string(), "Not found: user");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: FalconError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, FalconError::Other(_)));
    }
}
