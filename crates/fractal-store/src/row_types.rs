//! Flat row structs returned by queries.
//!
//! Rows are plain data: string enums stay strings from the database and
//! payloads stay JSON strings. Typed access happens at the edges
//! (orchestrator, API) where parse failures can be reported properly.

use serde::{Deserialize, Serialize};

/// A row from `nodes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRow {
    /// Node ID (`node_{uuid7}`).
    pub id: String,
    /// Parent node ID; `None` only for the root.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// `root` | `standard` | `exploration`.
    pub kind: String,
    /// `active` | `frozen` | `deleted`.
    pub status: String,
    /// Canvas X (opaque to the engine).
    pub position_x: f64,
    /// Canvas Y (opaque to the engine).
    pub position_y: f64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Optional actor that created the node.
    pub created_by: Option<String>,
}

/// A row from `node_events` — one immutable ledger fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    /// Event ID (`evt_{uuid7}`).
    pub id: String,
    /// Owning node.
    pub node_id: String,
    /// Event kind (kebab-case).
    pub kind: String,
    /// Structured payload as a JSON string.
    pub payload: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Optional actor.
    pub actor: Option<String>,
}

/// A row from `messages`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    /// Message ID (`msg_{uuid7}`).
    pub id: String,
    /// Owning node.
    pub node_id: String,
    /// `user` | `assistant` | `system` | `summary`.
    pub role: String,
    /// Message text.
    pub content: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Approximate token count, if estimated.
    pub token_estimate: Option<i64>,
}

/// A row from `node_summaries`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// Summary ID (`sum_{uuid7}`).
    pub id: String,
    /// Owning node.
    pub node_id: String,
    /// Structured payload as a JSON string.
    pub payload: String,
    /// Ledger event that generated this summary.
    pub generated_from_event: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// At most one per node.
    pub is_latest: bool,
}

/// A row from `graph_edges`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRow {
    /// Edge ID (`edge_{uuid7}`).
    pub id: String,
    /// Source entity name.
    pub from_entity: String,
    /// Target entity name.
    pub to_entity: String,
    /// Relation type (e.g. USES).
    pub relation_type: String,
    /// Node the edge currently belongs to.
    pub owner_node: String,
    /// Node that originally contributed the edge (audit trail across merges).
    pub provenance_node: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Soft-delete timestamp; deleted edges are excluded from all reads.
    pub deleted_at: Option<String>,
}
