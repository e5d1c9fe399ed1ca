//! Authentication module
//!
//! The credential/session core of the service:
//! - Password hashing with Argon2
//! - Token generation and validation
//! - Sliding-window rate limiting
//! - Credential store over SQLite
//! - Authentication service orchestrating the above
//! - Middleware for request authentication

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limit;
pub mod repository;
pub mod service;

pub use jwt::{issue_access_token, issue_refresh_token, validate_token, Claims, JwtConfig};
pub use middleware::{auth_middleware, bearer_token, client_ip, AuthenticatedUser};
pub use models::User;
pub use password::{hash_password, verify_password, PasswordConfig};
pub use rate_limit::SlidingWindowLimiter;
pub use repository::{init_schema, RepositoryError, UserRepository};
pub use service::{
    AccessTokenResponse, AuthService, PasswordReset, PasswordResetRequest, RegisterRequest,
    TokenResponse, UserInfo,
};
