//! Database models for authentication
//!
//! Defines the user account structure persisted in the `users` table.
//! Credential material on the model is never serialized in API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User account model
///
/// Maps to the `users` table. The email is the primary key; the three
/// credential fields hold, respectively, the Argon2id digest, the single
/// live refresh token, and the single pending reset token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// User's email address (unique, used for login)
    pub email: String,

    /// Hashed password (Argon2id PHC string).
    /// Never serialized in API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Latest issued refresh token; reissuing overwrites and thereby
    /// invalidates the previous one
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    /// Pending single-use password reset token
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,

    /// Expiry of the pending reset token
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_fields_never_serialized() {
        let user = User {
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            refresh_token: Some("refresh".to_string()),
            reset_token: Some("reset".to_string()),
            reset_token_expires_at: Some(Utc::now()),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("refresh"));
        assert!(!json.contains("reset"));
    }
}
