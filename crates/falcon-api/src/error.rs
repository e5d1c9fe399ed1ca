//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use falcon_core::FalconError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Could not validate credentials")
    }

    pub fn too_many_requests() -> Self {
        Self::new("TOO_MANY_REQUESTS", "Too many requests")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    TooManyRequests,
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::not_found(&msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Unauthorized => {
                // Challenge the client the way the OAuth2 password flow expects
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    Json(ApiError::unauthorized()),
                )
                    .into_response();
            }
            AppError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, ApiError::too_many_requests())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::internal_error().with_details(msg),
                )
            }
            AppError::Database(msg) => {
                // Fatal to the request, not the process; message carries no secrets
                tracing::error!(error = %msg, "database failure while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("DATABASE_ERROR", "Database operation failed").with_details(msg),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<FalconError> for AppError {
    fn from(err: FalconError) -> Self {
        match err {
            FalconError::NotFound(msg) => AppError::NotFound(msg),
            FalconError::AlreadyExists(msg) => AppError::BadRequest(msg),
            FalconError::InvalidCredentials => AppError::Unauthorized,
            FalconError::InvalidToken => {
                AppError::BadRequest("Invalid or expired token".to_string())
            }
            FalconError::InvalidResetToken => {
                AppError::BadRequest("Invalid or expired reset token".to_string())
            }
            FalconError::TooManyRequests => AppError::TooManyRequests,
            FalconError::Database(msg) => AppError::Database(msg),
            FalconError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            FalconError::Internal(msg) => AppError::Internal(msg),
            FalconError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(FalconError::InvalidCredentials), 401),
            (AppError::from(FalconError::InvalidToken), 400),
            (AppError::from(FalconError::TooManyRequests), 429),
            (
                AppError::from(FalconError::AlreadyExists("x".to_string())),
                400,
            ),
            (AppError::from(FalconError::NotFound("x".to_string())), 404),
            (AppError::from(FalconError::Database("x".to_string())), 500),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let json = serde_json::to_string(&ApiError::unauthorized()).unwrap();
        assert!(!json.contains("details"));

        let json =
            serde_json::to_string(&ApiError::internal_error().with_details("boom")).unwrap();
        assert!(json.contains("boom"));
    }
}
