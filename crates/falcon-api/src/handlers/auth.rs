//! Authentication API handlers
//!
//! HTTP endpoints for login, token refresh, registration, password reset,
//! and the current-user lookup.
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::{bearer_token, client_ip};
use crate::auth::{
    AccessTokenResponse, AuthenticatedUser, PasswordReset, PasswordResetRequest, RegisterRequest,
    TokenResponse, UserInfo,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use utoipa::ToSchema;

/// OAuth2 password-flow login form
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

/// Plain message response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Password reset request response
///
/// The token is echoed to the caller; this channel is a development
/// stand-in for out-of-band delivery and must be treated as untrusted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PasswordResetResponse {
    pub message: String,
    pub token: String,
}

/// Login with username (email) and password
///
/// Form-encoded to match the OAuth2 password flow. Returns an access token
/// valid for 30 minutes and a refresh token valid for 30 days; the refresh
/// token replaces any previously issued one for the account.
#[utoipa::path(
    post,
    path = "/token",
    tag = "auth",
    request_body(content = TokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = crate::error::ApiError),
        (status = 429, description = "Too many requests", body = crate::error::ApiError),
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<TokenForm>,
) -> Result<impl IntoResponse, AppError> {
    let client = client_ip(&headers, connect_info.map(|ci| ci.0));
    let tokens = state
        .auth
        .login(client, &form.username, &form.password)
        .await?;

    Ok(Json(tokens))
}

/// Exchange a refresh token for a new access token
///
/// The refresh token travels in the Authorization header as a bearer
/// credential and must equal the one most recently issued to its subject.
#[utoipa::path(
    post,
    path = "/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New access token issued", body = AccessTokenResponse),
        (status = 400, description = "Invalid refresh token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let refresh_token = bearer_token(&headers)
        .ok_or_else(|| AppError::BadRequest("Missing refresh token".to_string()))?;

    let response = state.auth.refresh(refresh_token).await?;

    Ok(Json(response))
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Email already registered", body = crate::error::ApiError),
        (status = 429, description = "Too many requests", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = client_ip(&headers, connect_info.map(|ci| ci.0));
    state
        .auth
        .register(client, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".to_string(),
        }),
    ))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Invalid or missing access token", body = crate::error::ApiError),
        (status = 404, description = "Subject no longer exists", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(UserInfo { email: user.email }))
}

/// Request a password reset token
#[utoipa::path(
    post,
    path = "/password-reset-request",
    tag = "auth",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset token generated", body = PasswordResetResponse),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn password_reset_request_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.auth.request_password_reset(&request.email).await?;

    Ok(Json(PasswordResetResponse {
        message: "Password reset token generated".to_string(),
        token,
    }))
}

/// Consume a reset token and set a new password
#[utoipa::path(
    post,
    path = "/reset-password",
    tag = "auth",
    request_body = PasswordReset,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token", body = crate::error::ApiError),
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordReset>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .confirm_password_reset(&request.token, &request.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}
