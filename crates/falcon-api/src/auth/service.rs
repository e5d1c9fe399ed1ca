//! Authentication service layer
//!
//! Business logic for login, token refresh, registration, password reset,
//! and current-user lookup. Orchestrates the credential store, password
//! hasher, token issuer, and rate limiters; HTTP handlers call into this
//! layer and translate the results.

use super::jwt::{issue_access_token, issue_refresh_token, validate_token, JwtConfig};
use super::password::{hash_password_with_config, verify_password, PasswordConfig, PasswordError};
use super::rate_limit::SlidingWindowLimiter;
use super::repository::{RepositoryError, UserRepository};
use base64::Engine;
use chrono::{Duration, Utc};
use falcon_core::{AuthConfig, FalconError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::net::IpAddr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Password reset request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password reset confirmation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
}

/// Login response with both tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
}

/// Refresh response with a new access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Authenticated user information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub email: String,
}

impl From<RepositoryError> for FalconError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UserNotFound => FalconError::NotFound("User not found".to_string()),
            RepositoryError::EmailAlreadyExists => {
                FalconError::AlreadyExists("Email already registered".to_string())
            }
            RepositoryError::TokenNotFound => FalconError::InvalidResetToken,
            RepositoryError::DatabaseError(msg) => FalconError::Database(msg),
        }
    }
}

/// Authentication service
pub struct AuthService {
    users: UserRepository,
    jwt: JwtConfig,
    password_config: PasswordConfig,
    login_limiter: SlidingWindowLimiter,
    register_limiter: SlidingWindowLimiter,
    reset_token_ttl: Duration,
    admin_email: String,
    admin_password: Option<String>,
}

impl AuthService {
    /// Create a new authentication service over the shared pool
    pub fn new(pool: SqlitePool, auth: &AuthConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt: JwtConfig::from_auth_config(auth),
            password_config: PasswordConfig::default(),
            login_limiter: SlidingWindowLimiter::from_settings(auth.login_limit),
            register_limiter: SlidingWindowLimiter::from_settings(auth.register_limit),
            reset_token_ttl: Duration::minutes(auth.reset_token_ttl_mins as i64),
            admin_email: auth.admin_email.clone(),
            admin_password: auth.admin_password.clone(),
        }
    }

    /// Override the Argon2 parameters (used by tests to keep hashing cheap)
    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.password_config = config;
        self
    }

    /// Authenticate with email and password, issuing an access/refresh pair.
    ///
    /// The refresh token is persisted as the subject's single live token,
    /// which invalidates any previously issued one. A missing user and a
    /// wrong password are externally indistinguishable.
    pub async fn login(
        &self,
        client: IpAddr,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, FalconError> {
        if !self.login_limiter.admit(client) {
            return Err(FalconError::TooManyRequests);
        }

        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            Err(RepositoryError::UserNotFound) => return Err(FalconError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        if !self.verify_blocking(password, &user.password_hash).await? {
            return Err(FalconError::InvalidCredentials);
        }

        let access_token = issue_access_token(&self.jwt, &user.email)
            .map_err(|e| FalconError::Internal(format!("Failed to issue access token: {e}")))?;
        let refresh_token = issue_refresh_token(&self.jwt, &user.email)
            .map_err(|e| FalconError::Internal(format!("Failed to issue refresh token: {e}")))?;

        self.users
            .set_refresh_token(&user.email, &refresh_token)
            .await?;

        tracing::info!(email = %user.email, "user logged in");

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The token must be well-signed, unexpired, and equal to the stored
    /// value for its subject; every failure collapses into `InvalidToken`
    /// so callers cannot probe which check tripped.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokenResponse, FalconError> {
        let claims =
            validate_token(&self.jwt, refresh_token).map_err(|_| FalconError::InvalidToken)?;

        let user = match self.users.find_by_email(&claims.sub).await {
            Ok(user) => user,
            Err(RepositoryError::UserNotFound) => return Err(FalconError::InvalidToken),
            Err(e) => return Err(e.into()),
        };

        if user.refresh_token.as_deref() != Some(refresh_token) {
            return Err(FalconError::InvalidToken);
        }

        let access_token = issue_access_token(&self.jwt, &user.email)
            .map_err(|e| FalconError::Internal(format!("Failed to issue access token: {e}")))?;

        Ok(AccessTokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Register a new user account
    pub async fn register(
        &self,
        client: IpAddr,
        email: &str,
        password: &str,
    ) -> Result<UserInfo, FalconError> {
        if !self.register_limiter.admit(client) {
            return Err(FalconError::TooManyRequests);
        }

        // Cheap existence check before paying for Argon2; the primary key
        // still decides races between concurrent registrations.
        if self.users.find_by_email(email).await.is_ok() {
            return Err(FalconError::AlreadyExists(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = self.hash_blocking(password).await?;
        let user = self.users.create(email, &password_hash).await?;

        tracing::info!(email = %user.email, "new user registered");

        Ok(UserInfo { email: user.email })
    }

    /// Resolve the user behind an access token.
    ///
    /// Token-level failures surface as `InvalidToken`; a well-signed token
    /// whose subject no longer exists surfaces as `NotFound`.
    pub async fn current_user(&self, access_token: &str) -> Result<UserInfo, FalconError> {
        let claims =
            validate_token(&self.jwt, access_token).map_err(|_| FalconError::InvalidToken)?;

        let user = match self.users.find_by_email(&claims.sub).await {
            Ok(user) => user,
            Err(RepositoryError::UserNotFound) => {
                return Err(FalconError::NotFound("User not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(UserInfo { email: user.email })
    }

    /// Generate and persist a pending password reset token.
    ///
    /// The token is returned to the caller; wiring it to an out-of-band
    /// delivery channel is left to deployments, and the HTTP response that
    /// echoes it is a development stand-in.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, FalconError> {
        let user = self.users.find_by_email(email).await?;

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.users
            .set_reset_token(&user.email, &token, expires_at)
            .await?;

        tracing::info!(email = %user.email, "password reset requested");

        Ok(token)
    }

    /// Consume a reset token and set a new password.
    ///
    /// Unknown, already-used, and expired tokens all report
    /// `InvalidResetToken`. On success the token is cleared, so a second
    /// confirmation with the same token fails.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), FalconError> {
        let user = match self.users.find_by_reset_token(token).await {
            Ok(user) => user,
            Err(RepositoryError::TokenNotFound) => return Err(FalconError::InvalidResetToken),
            Err(e) => return Err(e.into()),
        };

        let expired = user
            .reset_token_expires_at
            .map_or(true, |expires_at| expires_at < Utc::now());
        if expired {
            self.users.clear_reset_token(&user.email).await?;
            return Err(FalconError::InvalidResetToken);
        }

        let password_hash = self.hash_blocking(new_password).await?;
        self.users
            .update_password(&user.email, &password_hash)
            .await?;
        self.users.clear_reset_token(&user.email).await?;

        tracing::info!(email = %user.email, "password reset completed");

        Ok(())
    }

    /// Ensure an administrative account exists when the store is empty.
    ///
    /// Without a configured password a random one-time credential is
    /// generated and logged once; it is expected to be rotated immediately.
    pub async fn bootstrap_default_admin(&self) -> Result<(), FalconError> {
        if self.users.count_users().await? > 0 {
            return Ok(());
        }

        let generated = self.admin_password.is_none();
        let password = match &self.admin_password {
            Some(password) => password.clone(),
            None => generate_one_time_password(),
        };

        let password_hash = self.hash_blocking(&password).await?;
        match self.users.create(&self.admin_email, &password_hash).await {
            Ok(_) => {
                if generated {
                    tracing::warn!(
                        email = %self.admin_email,
                        password = %password,
                        "bootstrap admin created with a generated one-time password; rotate it immediately"
                    );
                } else {
                    tracing::info!(email = %self.admin_email, "bootstrap admin created");
                }
                Ok(())
            }
            // Lost a race against a concurrent bootstrap or registration
            Err(RepositoryError::EmailAlreadyExists) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop rate-limiter identifiers that have aged out of their windows
    pub fn evict_stale_rate_limits(&self) {
        self.login_limiter.evict_stale();
        self.register_limiter.evict_stale();
    }

    /// Hash a password on the blocking pool; Argon2 is deliberately
    /// expensive and must not stall the request runtime
    async fn hash_blocking(&self, password: &str) -> Result<String, FalconError> {
        let password = password.to_string();
        let config = self.password_config.clone();

        tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
            .await
            .map_err(|e| FalconError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e: PasswordError| FalconError::Internal(e.to_string()))
    }

    /// Verify a password on the blocking pool
    async fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, FalconError> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| FalconError::Internal(format!("Verification task failed: {e}")))
    }
}

/// Generate a random URL-safe one-time password
fn generate_one_time_password() -> String {
    let bytes: [u8; 18] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::init_schema;
    use falcon_core::RateLimitSettings;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::net::Ipv4Addr;

    fn client() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    fn light_password_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    async fn test_service() -> AuthService {
        test_service_with(AuthConfig::default()).await
    }

    async fn test_service_with(auth: AuthConfig) -> AuthService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        init_schema(&pool).await.expect("schema init failed");

        AuthService::new(pool, &auth).with_password_config(light_password_config())
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = test_service().await;

        service
            .register(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();

        let tokens = service
            .login(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();
        assert_eq!(tokens.token_type, "bearer");

        let claims = validate_token(&service.jwt, &tokens.access_token).unwrap();
        assert_eq!(claims.sub, "a@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = test_service().await;
        service
            .register(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();

        let absent = service
            .login(client(), "ghost@example.com", "whatever")
            .await;
        let wrong = service.login(client(), "a@example.com", "wrong").await;

        assert!(matches!(absent, Err(FalconError::InvalidCredentials)));
        assert!(matches!(wrong, Err(FalconError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let service = test_service().await;

        service
            .register(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();
        let result = service.register(client(), "a@example.com", "other").await;
        assert!(matches!(result, Err(FalconError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_refresh_requires_stored_token_match() {
        let service = test_service().await;
        service
            .register(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();

        let first = service
            .login(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();
        assert!(service.refresh(&first.refresh_token).await.is_ok());

        // A second login rotates the stored token and invalidates the first
        let second = service
            .login(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();

        let stale = service.refresh(&first.refresh_token).await;
        assert!(matches!(stale, Err(FalconError::InvalidToken)));
        assert!(service.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token_shaped_garbage() {
        let service = test_service().await;
        let result = service.refresh("not-a-jwt").await;
        assert!(matches!(result, Err(FalconError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_current_user_roundtrip() {
        let service = test_service().await;
        service
            .register(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();

        let tokens = service
            .login(client(), "a@example.com", "hunter2!")
            .await
            .unwrap();
        let info = service.current_user(&tokens.access_token).await.unwrap();
        assert_eq!(info.email, "a@example.com");

        let bad = service.current_user("garbage").await;
        assert!(matches!(bad, Err(FalconError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let service = test_service().await;
        service
            .register(client(), "a@example.com", "old-password")
            .await
            .unwrap();

        let token = service
            .request_password_reset("a@example.com")
            .await
            .unwrap();
        service
            .confirm_password_reset(&token, "new-password")
            .await
            .unwrap();

        let old = service.login(client(), "a@example.com", "old-password").await;
        assert!(matches!(old, Err(FalconError::InvalidCredentials)));
        assert!(service
            .login(client(), "a@example.com", "new-password")
            .await
            .is_ok());

        // The token is single-use
        let reuse = service.confirm_password_reset(&token, "another").await;
        assert!(matches!(reuse, Err(FalconError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_reset_for_unknown_user() {
        let service = test_service().await;
        let result = service.request_password_reset("ghost@example.com").await;
        assert!(matches!(result, Err(FalconError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_login_rate_limit() {
        let auth = AuthConfig {
            login_limit: RateLimitSettings {
                max_requests: 2,
                window_seconds: 60,
            },
            ..Default::default()
        };
        let service = test_service_with(auth).await;

        for _ in 0..2 {
            let _ = service.login(client(), "ghost@example.com", "nope").await;
        }
        let third = service.login(client(), "ghost@example.com", "nope").await;
        assert!(matches!(third, Err(FalconError::TooManyRequests)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_once() {
        let auth = AuthConfig {
            admin_password: Some("pinned-admin-password".to_string()),
            ..Default::default()
        };
        let service = test_service_with(auth).await;

        service.bootstrap_default_admin().await.unwrap();
        assert!(service
            .login(client(), "admin@example.com", "pinned-admin-password")
            .await
            .is_ok());

        // A populated store is left untouched
        service.bootstrap_default_admin().await.unwrap();
        assert_eq!(service.users.count_users().await.unwrap(), 1);
    }
}
