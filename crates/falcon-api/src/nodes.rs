//! Node registry
//!
//! CRUD over node records, scoped strictly to the owning user. Depends on
//! the auth layer only for the authenticated caller's identity.

use crate::auth::repository::RepositoryError;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

/// Node status enum
///
/// Newly registered nodes start `offline`; status transitions happen through
/// monitoring endpoints outside this service's scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
}

impl NodeStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "online" => Some(NodeStatus::Online),
            "offline" => Some(NodeStatus::Offline),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Node machine record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Node {
    /// Store-assigned sequential identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Network address of the machine
    pub ip_address: String,
    /// Service port
    pub port: u16,
    /// Current status
    pub status: NodeStatus,
    /// Owning user's email
    pub owner_email: String,
}

/// Internal node row
#[derive(Debug, Clone, sqlx::FromRow)]
struct NodeRecord {
    id: i64,
    name: String,
    ip_address: String,
    port: i64,
    status: String,
    owner_email: String,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Node {
            id: record.id,
            name: record.name,
            ip_address: record.ip_address,
            port: record.port as u16,
            status: NodeStatus::from_str(&record.status).unwrap_or(NodeStatus::Offline),
            owner_email: record.owner_email,
        }
    }
}

/// Node repository over the shared pool
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: SqlitePool,
}

impl NodeRepository {
    /// Create a new node repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a node for the given owner.
    ///
    /// The id is assigned by the store and the status initialized to
    /// `offline`.
    pub async fn create(
        &self,
        owner_email: &str,
        name: &str,
        ip_address: &str,
        port: u16,
    ) -> Result<Node, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO nodes (name, ip_address, port, status, owner_email) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(ip_address)
        .bind(port as i64)
        .bind(NodeStatus::Offline.as_str())
        .bind(owner_email)
        .execute(&self.pool)
        .await?;

        Ok(Node {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            ip_address: ip_address.to_string(),
            port,
            status: NodeStatus::Offline,
            owner_email: owner_email.to_string(),
        })
    }

    /// List the owner's nodes in insertion order
    pub async fn list_by_owner(&self, owner_email: &str) -> Result<Vec<Node>, RepositoryError> {
        let records = sqlx::query_as::<_, NodeRecord>(
            "SELECT id, name, ip_address, port, status, owner_email FROM nodes WHERE owner_email = ? ORDER BY id",
        )
        .bind(owner_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Node::from).collect())
    }
}
