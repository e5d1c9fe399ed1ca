//! Bearer authentication middleware
//!
//! Extracts the access token from the Authorization header, resolves the
//! user through the auth service, and adds the identity to request
//! extensions for handlers to consume.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use falcon_core::FalconError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Authenticated user identity extracted from the access token
///
/// Added to request extensions by [`auth_middleware`]; handlers read it
/// with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User's email address (token subject)
    pub email: String,
}

/// Bearer authentication middleware
///
/// Token-level failures answer 401; a well-signed token whose subject no
/// longer exists answers 404.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let user = state.auth.current_user(token).await.map_err(|e| match e {
        FalconError::InvalidToken => AppError::Unauthorized,
        other => AppError::from(other),
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { email: user.email });

    Ok(next.run(request).await)
}

/// Extract the bearer token from an Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Resolve the client address used as the rate-limiting identifier.
///
/// Checks X-Forwarded-For (proxy/load balancer), then X-Real-IP (nginx),
/// then the peer address of the connection. Unparseable headers fall
/// through rather than fail the request.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // Take the first IP in the chain (client IP)
            if let Some(ip) = xff_str.split(',').next().and_then(|s| s.trim().parse().ok()) {
                return ip;
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Some(ip) = real_ip.to_str().ok().and_then(|s| s.trim().parse().ok()) {
            return ip;
        }
    }

    peer.map(|p| p.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc.def.ghi".parse().unwrap(),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Basic dXNlcjpwYXNz".parse().unwrap(),
        );
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_client_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 10.0.0.1".parse().unwrap(),
        );

        let ip = client_ip(&headers, None);
        assert_eq!(ip, "203.0.113.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.7".parse().unwrap());

        let ip = client_ip(&headers, None);
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "198.51.100.2:45000".parse().unwrap();
        let ip = client_ip(&HeaderMap::new(), Some(peer));
        assert_eq!(ip, "198.51.100.2".parse::<IpAddr>().unwrap());

        // No information at all resolves to loopback
        let ip = client_ip(&HeaderMap::new(), None);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_client_ip_ignores_garbage_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "not-an-address".parse().unwrap());

        let ip = client_ip(&headers, None);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
