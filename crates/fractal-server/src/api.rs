//! Wire types for the HTTP API.
//!
//! Everything is camelCase JSON. Response types are built from the runtime's
//! outcome/row types; they never leak storage internals like rowids or
//! event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fractal_runtime::orchestrator::TreeNode;
use fractal_runtime::{CopyOutcome, DeleteOutcome, GraphView, MergeOutcome, MessageOutcome};
use fractal_store::row_types::{EdgeRow, MessageRow, NodeRow};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /api/v1/nodes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeBody {
    /// Parent node id; omitted means "under the root".
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// `standard` or `exploration`.
    #[serde(default = "default_node_type")]
    pub node_type: String,
}

fn default_node_type() -> String {
    "standard".to_string()
}

/// Body of `POST /api/v1/nodes/{id}/messages`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    /// The user's message.
    pub content: String,
}

/// Body of `POST /api/v1/nodes/merge`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeBody {
    /// Branch being folded back.
    pub source_node_id: String,
    /// Ancestor receiving the knowledge.
    pub target_node_id: String,
}

/// Body of `POST /api/v1/nodes/{id}/delete`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBody {
    /// Also delete the whole subtree.
    #[serde(default)]
    pub cascade: bool,
}

/// Body of `POST /api/v1/nodes/{id}/copy`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyBody {
    /// Where to attach the copy; defaults to the source's parent.
    pub new_parent_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Canvas position.
#[derive(Debug, Serialize)]
pub struct Position {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

/// A node as the API presents it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    /// Node id.
    pub node_id: String,
    /// Parent id, `null` for the root.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// `root`, `standard`, or `exploration`.
    pub node_type: String,
    /// `active`, `frozen`, or `deleted`.
    pub status: String,
    /// Canvas position.
    pub position: Position,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Who created the node, when recorded.
    pub created_by: Option<String>,
}

impl From<NodeRow> for NodeResponse {
    fn from(row: NodeRow) -> Self {
        Self {
            node_id: row.id,
            parent_id: row.parent_id,
            title: row.title,
            node_type: row.kind,
            status: row.status,
            position: Position {
                x: row.position_x,
                y: row.position_y,
            },
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

/// A message as the API presents it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Message id.
    pub message_id: String,
    /// Owning node.
    pub node_id: String,
    /// `user`, `assistant`, `system`, or `summary`.
    pub role: String,
    /// Message text.
    pub content: String,
    /// When it was said (RFC 3339).
    pub timestamp: String,
    /// Approximate token count.
    pub token_estimate: Option<i64>,
    /// Role that produced an assistant reply, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_used: Option<String>,
    /// Originally requested role, when a fallback happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<String>,
}

impl From<MessageRow> for MessageResponse {
    fn from(row: MessageRow) -> Self {
        Self {
            message_id: row.id,
            node_id: row.node_id,
            role: row.role,
            content: row.content,
            timestamp: row.timestamp,
            token_estimate: row.token_estimate,
            agent_used: None,
            fallback_from: None,
        }
    }
}

impl From<MessageOutcome> for MessageResponse {
    fn from(outcome: MessageOutcome) -> Self {
        let mut response = Self::from(outcome.message);
        response.agent_used = Some(outcome.agent_used.as_str().to_string());
        response.fallback_from = outcome.fallback_from.map(|r| r.as_str().to_string());
        response
    }
}

/// Edge counts reported after graph extraction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphCounts {
    /// Entities the extraction mentioned.
    pub entities: usize,
    /// New edges stored.
    pub relations_added: usize,
    /// Already-known triples skipped.
    pub skipped: usize,
}

/// Response of `POST /api/v1/nodes/{id}/summarize`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    /// Committed summary row id.
    pub summary_id: String,
    /// Summarized node.
    pub node_id: String,
    /// The structured summary payload.
    pub summary: Value,
    /// `success` or `failed` — the summary itself is committed either way.
    pub graph_extraction_status: String,
    /// Edge counts when extraction succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_graph: Option<GraphCounts>,
    /// What went wrong when extraction failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_extraction_error: Option<String>,
}

/// Response of `POST /api/v1/nodes/merge`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    /// Ancestor that received the knowledge.
    pub target_node_id: String,
    /// Branch that was folded back.
    pub source_node_id: String,
    /// The target's new latest summary.
    pub updated_summary: Value,
    /// Unresolved conflicts, for manual handling.
    pub conflicts: Vec<Value>,
    /// How source edges were folded into the target's graph.
    pub knowledge_graph_updates: KnowledgeGraphUpdates,
    /// Source status after the merge (always `frozen`).
    pub source_node_status: String,
}

/// Edge-folding counts for a merge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraphUpdates {
    /// Source edges that confirmed an existing target edge.
    pub edges_boosted: usize,
    /// Source edges moved to the target.
    pub edges_reattributed: usize,
}

impl From<MergeOutcome> for MergeResponse {
    fn from(outcome: MergeOutcome) -> Self {
        Self {
            target_node_id: outcome.target_id,
            source_node_id: outcome.source.id,
            updated_summary: outcome.updated_summary,
            conflicts: outcome.conflicts,
            knowledge_graph_updates: KnowledgeGraphUpdates {
                edges_boosted: outcome.edges_boosted,
                edges_reattributed: outcome.edges_reattributed,
            },
            source_node_status: outcome.source.status,
        }
    }
}

/// Response of `POST /api/v1/nodes/{id}/delete`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// The requested node.
    pub node_id: String,
    /// Status after the operation (always `deleted`).
    pub status: String,
    /// Descendants also deleted (empty without cascade).
    pub affected_descendants: Vec<String>,
    /// Whether ancestor summaries were recomputed (currently always false).
    pub recomputed: bool,
    /// Graph edges soft-deleted across all affected nodes.
    pub graph_edges_removed: usize,
}

impl From<DeleteOutcome> for DeleteResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            node_id: outcome.node_id,
            status: "deleted".to_string(),
            affected_descendants: outcome.affected_descendants,
            recomputed: outcome.recomputed,
            graph_edges_removed: outcome.edges_deleted,
        }
    }
}

/// Response of `POST /api/v1/nodes/{id}/copy`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResponse {
    /// The new node.
    #[serde(flatten)]
    pub node: NodeResponse,
    /// Messages carried over from the source.
    pub messages_copied: usize,
    /// Id of the source's latest summary, linked by reference.
    pub summary_ref: Option<String>,
}

impl From<CopyOutcome> for CopyResponse {
    fn from(outcome: CopyOutcome) -> Self {
        Self {
            node: NodeResponse::from(outcome.node),
            messages_copied: outcome.messages_copied,
            summary_ref: outcome.summary_ref,
        }
    }
}

/// One subtree of `GET /api/v1/nodes/tree`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeResponse {
    /// Node id.
    pub node_id: String,
    /// Display title.
    pub title: String,
    /// `active`, `frozen`, or `deleted`.
    pub status: String,
    /// `root`, `standard`, or `exploration`.
    pub node_type: String,
    /// Canvas position.
    pub position: Position,
    /// Whether a latest summary exists.
    pub has_summary: bool,
    /// Short preview of the latest summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    /// Child subtrees.
    pub children: Vec<TreeNodeResponse>,
}

impl From<TreeNode> for TreeNodeResponse {
    fn from(tree: TreeNode) -> Self {
        Self {
            node_id: tree.node.id,
            title: tree.node.title,
            status: tree.node.status,
            node_type: tree.node.kind,
            position: Position {
                x: tree.node.position_x,
                y: tree.node.position_y,
            },
            has_summary: tree.has_summary,
            summary_text: tree.summary_text,
            children: tree.children.into_iter().map(Self::from).collect(),
        }
    }
}

/// One edge of `GET /api/v1/nodes/{id}/graph`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdgeResponse {
    /// Subject entity.
    pub from_entity: String,
    /// Object entity.
    pub to_entity: String,
    /// Relation label.
    pub relation_type: String,
    /// Extraction confidence.
    pub confidence: f64,
    /// Node where the triple was originally learned.
    pub source_node: String,
}

impl From<EdgeRow> for GraphEdgeResponse {
    fn from(row: EdgeRow) -> Self {
        Self {
            from_entity: row.from_entity,
            to_entity: row.to_entity,
            relation_type: row.relation_type,
            confidence: row.confidence,
            source_node: row.provenance_node,
        }
    }
}

/// Response of `GET /api/v1/nodes/{id}/graph`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphResponse {
    /// Queried node.
    pub node_id: String,
    /// Unique entity names across the lineage.
    pub entities: Vec<String>,
    /// Live lineage edges.
    pub relations: Vec<GraphEdgeResponse>,
}

impl GraphResponse {
    /// Build from a lineage graph view.
    pub fn from_view(node_id: &str, view: GraphView) -> Self {
        Self {
            node_id: node_id.to_string(),
            entities: view.entities,
            relations: view
                .relations
                .into_iter()
                .map(GraphEdgeResponse::from)
                .collect(),
        }
    }
}
