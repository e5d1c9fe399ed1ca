//! Credential store over the embedded SQLite database
//!
//! Database access layer for user accounts. Every method issues a single
//! statement, so each call is an independent atomic transaction; no
//! multi-statement transaction spans store calls.

use super::models::User;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Token not found")]
    TokenNotFound,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::DatabaseError(err.to_string())
    }
}

/// Internal user row
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRecord {
    email: String,
    password_hash: String,
    refresh_token: Option<String>,
    reset_token: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            email: record.email,
            password_hash: record.password_hash,
            refresh_token: record.refresh_token,
            reset_token: record.reset_token,
            reset_token_expires_at: record.reset_token_expires_at,
        }
    }
}

/// Create the `users` and `nodes` tables if they do not exist yet.
///
/// Idempotent; runs at every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            email TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            refresh_token TEXT,
            reset_token TEXT,
            reset_token_expires_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            port INTEGER NOT NULL,
            status TEXT NOT NULL,
            owner_email TEXT NOT NULL,
            FOREIGN KEY (owner_email) REFERENCES users(email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// User repository over the shared pool
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT email, password_hash, refresh_token, reset_token, reset_token_expires_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::UserNotFound)?;

        Ok(record.into())
    }

    /// Create a new user with the given credential digest.
    ///
    /// The primary key on `email` makes concurrent duplicate registrations
    /// resolve to exactly one success; the loser surfaces as
    /// `EmailAlreadyExists`.
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User, RepositoryError> {
        sqlx::query("INSERT INTO users (email, password_hash) VALUES (?, ?)")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                    RepositoryError::EmailAlreadyExists
                }
                _ => RepositoryError::DatabaseError(e.to_string()),
            })?;

        Ok(User {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token: None,
            reset_token: None,
            reset_token_expires_at: None,
        })
    }

    /// Store the subject's single live refresh token, overwriting (and
    /// thereby invalidating) any previous one
    pub async fn set_refresh_token(&self, email: &str, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE email = ?")
            .bind(token)
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::UserNotFound);
        }
        Ok(())
    }

    /// Store a pending reset token with its expiry
    pub async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = ?, reset_token_expires_at = ? WHERE email = ?",
        )
        .bind(token)
        .bind(expires_at)
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::UserNotFound);
        }
        Ok(())
    }

    /// Clear the pending reset token after use
    pub async fn clear_reset_token(&self, email: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL WHERE email = ?",
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reverse-lookup the user holding a pending reset token
    pub async fn find_by_reset_token(&self, token: &str) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT email, password_hash, refresh_token, reset_token, reset_token_expires_at FROM users WHERE reset_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::TokenNotFound)?;

        Ok(record.into())
    }

    /// Replace the stored password digest
    pub async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE email = ?")
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::UserNotFound);
        }
        Ok(())
    }

    /// Total number of user accounts (bootstrap check)
    pub async fn count_users(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        init_schema(&pool).await.expect("schema init failed");
        pool
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = UserRepository::new(test_pool().await);

        let created = repo.create("a@example.com", "digest").await.unwrap();
        assert_eq!(created.email, "a@example.com");

        let found = repo.find_by_email("a@example.com").await.unwrap();
        assert_eq!(found.password_hash, "digest");
        assert!(found.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = UserRepository::new(test_pool().await);

        repo.create("a@example.com", "digest").await.unwrap();
        let result = repo.create("a@example.com", "other").await;
        assert!(matches!(result, Err(RepositoryError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let repo = UserRepository::new(test_pool().await);

        let result = repo.find_by_email("ghost@example.com").await;
        assert!(matches!(result, Err(RepositoryError::UserNotFound)));

        let result = repo.set_refresh_token("ghost@example.com", "tok").await;
        assert!(matches!(result, Err(RepositoryError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_refresh_token_overwrite() {
        let repo = UserRepository::new(test_pool().await);
        repo.create("a@example.com", "digest").await.unwrap();

        repo.set_refresh_token("a@example.com", "first").await.unwrap();
        repo.set_refresh_token("a@example.com", "second").await.unwrap();

        let user = repo.find_by_email("a@example.com").await.unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_reset_token_roundtrip() {
        let repo = UserRepository::new(test_pool().await);
        repo.create("a@example.com", "digest").await.unwrap();

        let expires = Utc::now() + chrono::Duration::minutes(60);
        repo.set_reset_token("a@example.com", "tok-123", expires)
            .await
            .unwrap();

        let user = repo.find_by_reset_token("tok-123").await.unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(user.reset_token_expires_at.is_some());

        repo.clear_reset_token("a@example.com").await.unwrap();
        let result = repo.find_by_reset_token("tok-123").await;
        assert!(matches!(result, Err(RepositoryError::TokenNotFound)));
    }

    #[tokio::test]
    async fn test_count_users() {
        let repo = UserRepository::new(test_pool().await);
        assert_eq!(repo.count_users().await.unwrap(), 0);

        repo.create("a@example.com", "digest").await.unwrap();
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }
}
