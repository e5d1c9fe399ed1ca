//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, health, nodes};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use falcon_core::AppConfig;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation for the service
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::token_handler,
        auth::refresh_handler,
        auth::register_handler,
        auth::me_handler,
        auth::password_reset_request_handler,
        auth::reset_password_handler,
        nodes::create_node_handler,
        nodes::list_nodes_handler,
        health::health_check,
    ),
    components(schemas(
        auth::TokenForm,
        auth::MessageResponse,
        auth::PasswordResetResponse,
        nodes::NodeCreate,
        crate::auth::TokenResponse,
        crate::auth::AccessTokenResponse,
        crate::auth::RegisterRequest,
        crate::auth::PasswordResetRequest,
        crate::auth::PasswordReset,
        crate::auth::UserInfo,
        crate::nodes::Node,
        crate::nodes::NodeStatus,
        crate::error::ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and session management"),
        (name = "nodes", description = "Per-user node registry"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/token", post(auth::token_handler))
        .route("/refresh", post(auth::refresh_handler))
        .route("/register", post(auth::register_handler))
        .route(
            "/password-reset-request",
            post(auth::password_reset_request_handler),
        )
        .route("/reset-password", post(auth::reset_password_handler))
        .route("/health", get(health::health_check));

    // Protected routes (bearer access token required)
    let protected_routes = Router::new()
        .route("/users/me", get(auth::me_handler))
        .route(
            "/nodes",
            post(nodes::create_node_handler).get(nodes::list_nodes_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from configuration.
///
/// With no configured origins the service is wide open, matching the
/// original development posture; production deployments list their origins.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<_> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
