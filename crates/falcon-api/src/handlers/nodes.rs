//! Node registry API handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::nodes::Node;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Node registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeCreate {
    pub name: String,
    pub ip_address: String,
    pub port: u16,
}

/// Register a node for the authenticated user
///
/// The node starts `offline`; its id is assigned by the store.
#[utoipa::path(
    post,
    path = "/nodes",
    tag = "nodes",
    request_body = NodeCreate,
    responses(
        (status = 201, description = "Node registered", body = Node),
        (status = 401, description = "Invalid or missing access token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_node_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<NodeCreate>,
) -> Result<impl IntoResponse, AppError> {
    let node = state
        .nodes
        .create(&user.email, &request.name, &request.ip_address, request.port)
        .await
        .map_err(falcon_core::FalconError::from)?;

    Ok((StatusCode::CREATED, Json(node)))
}

/// List the authenticated user's nodes
///
/// Strictly owner-scoped; other users' nodes are never visible here.
#[utoipa::path(
    get,
    path = "/nodes",
    tag = "nodes",
    responses(
        (status = 200, description = "Caller's nodes in insertion order", body = [Node]),
        (status = 401, description = "Invalid or missing access token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_nodes_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let nodes = state
        .nodes
        .list_by_owner(&user.email)
        .await
        .map_err(falcon_core::FalconError::from)?;

    Ok(Json(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_create_deserialization() {
        let json = r#"{"name": "edge-1", "ip_address": "10.0.0.1", "port": 8080}"#;
        let request: NodeCreate = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, "edge-1");
        assert_eq!(request.port, 8080);
    }
}
