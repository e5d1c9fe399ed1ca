//! Falcon API Server
//!
//! Authentication and node registry service.
//!
//! Author: hephaex@gmail.com

use falcon_api::{auth::repository, create_router, state::AppState};
use falcon_core::AppConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("falcon_api={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    // Open the embedded database, creating the file on first start
    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let options = SqliteConnectOptions::new()
        .filename(&config.database.path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(options)
        .await?;

    repository::init_schema(&pool).await?;

    // Create application state and ensure the admin account exists
    let state = Arc::new(AppState::new(config, pool));
    state.auth.bootstrap_default_admin().await?;

    // Periodically drop idle rate-limiter identifiers to bound memory
    let limiter_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter_state.auth.evict_stale_rate_limits();
        }
    });

    // Create router
    let app = create_router(state.clone());

    // Start server
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Falcon API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
