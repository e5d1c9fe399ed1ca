//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthService;
use crate::nodes::NodeRepository;
use falcon_core::AppConfig;
use sqlx::SqlitePool;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Shared SQLite pool
    pub pool: SqlitePool,
    /// Authentication service
    pub auth: AuthService,
    /// Node registry
    pub nodes: NodeRepository,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state over an initialized pool
    pub fn new(config: AppConfig, pool: SqlitePool) -> Self {
        let auth = AuthService::new(pool.clone(), &config.auth);
        let nodes = NodeRepository::new(pool.clone());

        Self {
            config,
            pool,
            auth,
            nodes,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
