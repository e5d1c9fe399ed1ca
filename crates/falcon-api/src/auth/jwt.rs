//! JWT token generation and validation
//!
//! Implements JWT-based authentication with HMAC-SHA256 signing.
//! Access tokens are valid for 30 minutes, refresh tokens for 30 days;
//! both carry only the subject email and the timestamp claims.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// JWT Claims structure
///
/// Deliberately minimal: the subject is the user's email, and the token
/// kind is not encoded here. A refresh token is only honored when it
/// matches the copy stored for its subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user email
    pub sub: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
///
/// Holds the process-wide signing secret and the validity windows.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: Vec<u8>,
    /// Access token expiration time in seconds (default: 1800 = 30 minutes)
    pub access_ttl_secs: u64,
    /// Refresh token expiration time in seconds (default: 2592000 = 30 days)
    pub refresh_ttl_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: generate_secret(),
            access_ttl_secs: 30 * 60,
            refresh_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

impl JwtConfig {
    /// Build the JWT configuration from the auth section of the app config.
    ///
    /// When no secret is provisioned, a fresh one is generated for this
    /// process; tokens issued before a restart then stop verifying, which
    /// is the accepted tradeoff for unprovisioned deployments.
    pub fn from_auth_config(auth: &falcon_core::AuthConfig) -> Self {
        let secret = match &auth.jwt_secret {
            Some(s) => s.as_bytes().to_vec(),
            None => generate_secret(),
        };

        Self {
            secret,
            access_ttl_secs: auth.access_token_ttl_mins * 60,
            refresh_ttl_secs: auth.refresh_token_ttl_days * 24 * 60 * 60,
        }
    }
}

/// Generate a 256-bit signing secret
fn generate_secret() -> Vec<u8> {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.to_vec()
}

/// Generate a signed access token for the given subject
///
/// # Returns
///
/// * `Ok(String)` - Encoded JWT valid for `access_ttl_secs` from now
/// * `Err(JwtError)` - If token generation fails
pub fn issue_access_token(config: &JwtConfig, subject: &str) -> Result<String, JwtError> {
    issue_token(config, subject, config.access_ttl_secs)
}

/// Generate a signed refresh token for the given subject
///
/// The caller is responsible for persisting the returned token as the
/// subject's single live refresh token.
pub fn issue_refresh_token(config: &JwtConfig, subject: &str) -> Result<String, JwtError> {
    issue_token(config, subject, config.refresh_ttl_secs)
}

fn issue_token(config: &JwtConfig, subject: &str, ttl_secs: u64) -> Result<String, JwtError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.secret),
    )?;

    Ok(token)
}

/// Validate a signed token and extract its claims
///
/// # Returns
///
/// * `Ok(Claims)` - Decoded and validated claims
/// * `Err(JwtError)` - If validation fails (expired, bad signature, malformed)
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(&config.secret),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
