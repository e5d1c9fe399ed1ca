//! Falcon API - authentication and node registry server
//!
//! A minimal authentication service backing a small node-registry API:
//! users register with email/password, obtain short-lived access tokens and
//! longer-lived refresh tokens, can reset forgotten passwords, and manage
//! per-user records of node machines.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod nodes;
pub mod routes;
pub mod state;

pub use routes::create_router;
