//! The Node Lifecycle Orchestrator.
//!
//! [`Engine`] sequences every user-facing operation: precondition checks
//! against the entity store, ledger+entity writes (delegated to
//! `WorkspaceStore`, which makes each pair atomic), context assembly, and
//! agent calls.
//!
//! Operations on one node are serialized through a keyed async lock registry
//! so two concurrent summarize calls cannot interleave their agent call and
//! commit phases. Operations on different nodes run fully in parallel — the
//! registry hands out one lock per node id, not a global lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use metrics::counter;
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, instrument, warn};

use fractal_core::summary::{GraphExtraction, MergeVerdict, SummaryPayload};
use fractal_core::text::estimate_tokens;
use fractal_core::types::{AgentRole, NodeKind};
use fractal_llm::AgentClient;
use fractal_settings::FractalSettings;
use fractal_store::row_types::{EdgeRow, EventRow, MessageRow, NodeRow, SummaryRow};
use fractal_store::store::{AppendMessageArgs, CopyNodeArgs, CreateNodeArgs, MergeCommitArgs};
use fractal_store::{StoreError, WorkspaceStore};

use crate::context::ContextAssembler;
use crate::errors::{EngineError, Result};
use crate::graph::{edge_specs, GraphOutcome, GraphUpdate};

/// Request to create a node.
#[derive(Clone, Debug)]
pub struct CreateNodeRequest {
    /// Parent node; `None` attaches under the root.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Node kind. `Root` is rejected — the root is bootstrapped at startup.
    pub kind: NodeKind,
}

/// Outcome of `send_message`.
#[derive(Clone, Debug)]
pub struct MessageOutcome {
    /// The persisted assistant message.
    pub message: MessageRow,
    /// Role that actually produced the reply.
    pub agent_used: AgentRole,
    /// Role originally requested, when a fallback happened.
    pub fallback_from: Option<AgentRole>,
}

/// Outcome of `summarize`.
#[derive(Clone, Debug)]
pub struct SummarizeOutcome {
    /// The committed latest summary.
    pub summary: SummaryRow,
    /// Parsed summary payload.
    pub payload: SummaryPayload,
    /// How graph extraction went. `Failed` means degraded, never rolled back.
    pub graph: GraphOutcome,
}

/// Outcome of `merge`.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    /// Merge target id.
    pub target_id: String,
    /// The source node, now frozen.
    pub source: NodeRow,
    /// The target's new latest summary row.
    pub summary: SummaryRow,
    /// The committed summary payload (conflicts attached when present).
    pub updated_summary: Value,
    /// Unresolved conflicts for manual handling. Never auto-resolved.
    pub conflicts: Vec<Value>,
    /// Source edges folded into existing target-lineage edges.
    pub edges_boosted: usize,
    /// Source edges moved to the target with provenance preserved.
    pub edges_reattributed: usize,
}

/// Outcome of `delete`.
#[derive(Clone, Debug)]
pub struct DeleteOutcome {
    /// The requested node.
    pub node_id: String,
    /// Descendants also transitioned (empty without cascade).
    pub affected_descendants: Vec<String>,
    /// Live edges soft-deleted across all affected nodes.
    pub edges_deleted: usize,
    /// Always false: summary recomputation is future replay work.
    pub recomputed: bool,
}

/// Outcome of `copy`.
#[derive(Clone, Debug)]
pub struct CopyOutcome {
    /// The new node.
    pub node: NodeRow,
    /// Messages carried over from the source.
    pub messages_copied: usize,
    /// The source's latest summary, linked by reference.
    pub summary_ref: Option<String>,
}

/// One node in the nested tree read.
#[derive(Clone, Debug)]
pub struct TreeNode {
    /// The node row.
    pub node: NodeRow,
    /// Whether a latest summary exists.
    pub has_summary: bool,
    /// Short preview built from the summary's first facts.
    pub summary_text: Option<String>,
    /// Child subtrees in creation order.
    pub children: Vec<TreeNode>,
}

/// Lineage graph read: entities plus the edges that mention them.
#[derive(Clone, Debug)]
pub struct GraphView {
    /// Unique entity names in first-seen order.
    pub entities: Vec<String>,
    /// Live edges owned by the node's lineage.
    pub relations: Vec<EdgeRow>,
}

/// The orchestration engine.
pub struct Engine {
    store: Arc<WorkspaceStore>,
    assembler: ContextAssembler,
    client: Arc<dyn AgentClient>,
    op_locks: StdMutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl Engine {
    /// Create an engine over a store and an agent client.
    pub fn new(
        store: Arc<WorkspaceStore>,
        client: Arc<dyn AgentClient>,
        settings: &FractalSettings,
    ) -> Self {
        let assembler =
            ContextAssembler::new(Arc::clone(&store), settings.context.recent_messages);
        Self {
            store,
            assembler,
            client,
            op_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Direct store access for read-only consumers.
    pub fn store(&self) -> &Arc<WorkspaceStore> {
        &self.store
    }

    fn op_lock(&self, node_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.op_locks.lock().expect("op lock map poisoned");
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }
        if let Some(existing) = locks.get(node_id).and_then(Weak::upgrade) {
            return existing;
        }
        let lock = Arc::new(AsyncMutex::new(()));
        let _ = locks.insert(node_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    fn require(&self, node_id: &str) -> Result<NodeRow> {
        match self.store.node(node_id) {
            Ok(node) => Ok(node),
            Err(StoreError::NodeNotFound(id)) => Err(EngineError::NotFound(format!("node {id}"))),
            Err(err) => Err(err.into()),
        }
    }

    async fn invoke(&self, role: AgentRole, system: &str, user: &str) -> Result<String> {
        self.client
            .complete(role, system, user)
            .await
            .map_err(|err| EngineError::from_router(role, err))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle operations
    // ─────────────────────────────────────────────────────────────────────

    /// Get or create the root node. Idempotent startup hook.
    pub fn bootstrap_root(&self, title: &str) -> Result<NodeRow> {
        Ok(self.store.ensure_root(title)?)
    }

    /// Create a node under a parent.
    #[instrument(skip(self, request), fields(kind = %request.kind))]
    pub fn create(&self, request: &CreateNodeRequest) -> Result<NodeRow> {
        if request.kind == NodeKind::Root {
            return Err(EngineError::InvalidState(
                "root nodes are bootstrapped at startup, not created".into(),
            ));
        }

        let parent = match &request.parent_id {
            Some(parent_id) => self.require(parent_id)?,
            None => self
                .store
                .root()?
                .ok_or_else(|| EngineError::NotFound("root node".into()))?,
        };
        if parent.status == "deleted" {
            return Err(EngineError::InvalidState(format!(
                "parent {} is deleted",
                parent.id
            )));
        }

        let result = self.store.create_node(&CreateNodeArgs {
            parent_id: Some(&parent.id),
            title: &request.title,
            kind: request.kind.as_str(),
            position: None,
            created_by: None,
        })?;
        Ok(result.node)
    }

    /// Chat with a node: persist the user message, invoke the chat agent,
    /// persist the reply.
    ///
    /// Exploration nodes try the `explorer` role first and fall back to
    /// `reasoner` on any failure — an expected condition, not an error.
    #[instrument(skip(self, content), fields(node = node_id))]
    pub async fn send_message(&self, node_id: &str, content: &str) -> Result<MessageOutcome> {
        let lock = self.op_lock(node_id);
        let _guard = lock.lock().await;

        let node = self.require(node_id)?;
        if node.status != "active" {
            return Err(EngineError::InvalidState(format!(
                "node {} is {}, not active",
                node.id, node.status
            )));
        }

        let _ = self.store.append_message(&AppendMessageArgs {
            node_id,
            role: "user",
            content,
            token_estimate: Some(estimate_tokens(content)),
            agent_used: None,
            fallback_from: None,
            actor: None,
        })?;

        let prompt = self.assembler.build_chat(node_id, content)?;

        let (reply, agent_used, fallback_from) = if node.kind == "exploration" {
            match self
                .client
                .complete(AgentRole::Explorer, &prompt.system, &prompt.user)
                .await
            {
                Ok(reply) => (reply, AgentRole::Explorer, None),
                Err(err) => {
                    warn!(error = %err, "explorer unavailable, falling back to reasoner");
                    counter!("fractal_explorer_fallback_total").increment(1);
                    let reply = self
                        .invoke(AgentRole::Reasoner, &prompt.system, &prompt.user)
                        .await?;
                    (reply, AgentRole::Reasoner, Some(AgentRole::Explorer))
                }
            }
        } else {
            let reply = self
                .invoke(AgentRole::Reasoner, &prompt.system, &prompt.user)
                .await?;
            (reply, AgentRole::Reasoner, None)
        };

        let appended = self.store.append_message(&AppendMessageArgs {
            node_id,
            role: "assistant",
            content: &reply,
            token_estimate: Some(estimate_tokens(&reply)),
            agent_used: Some(agent_used.as_str()),
            fallback_from: fallback_from.map(AgentRole::as_str),
            actor: None,
        })?;

        Ok(MessageOutcome {
            message: appended.message,
            agent_used,
            fallback_from,
        })
    }

    /// Distill a node into a structured summary, then attempt graph
    /// extraction.
    ///
    /// The summary commit is the durability point: whatever the graph
    /// builder does afterwards, the summary stays. Status-agnostic — frozen
    /// nodes can be summarized for audit.
    #[instrument(skip(self), fields(node = node_id))]
    pub async fn summarize(&self, node_id: &str) -> Result<SummarizeOutcome> {
        let lock = self.op_lock(node_id);
        let _guard = lock.lock().await;

        let _ = self.require(node_id)?;

        let prompt = self.assembler.build_summarize(node_id)?;
        let reply = self
            .invoke(AgentRole::Summarizer, &prompt.system, &prompt.user)
            .await?;
        let payload = SummaryPayload::parse(&reply)
            .map_err(|e| EngineError::MalformedAgentOutput(format!("summary: {e}")))?;
        let payload_value = serde_json::to_value(&payload).map_err(StoreError::from)?;

        let committed =
            self.store
                .commit_summary(node_id, &payload_value, Some("summarize"), None)?;

        // Structural distillation is decoupled: failure here degrades the
        // response, never the committed summary.
        let graph = match self.extract_graph(node_id, &payload_value).await {
            Ok(update) => GraphOutcome::Success(update),
            Err(err) => {
                error!(node = node_id, error = %err, "graph extraction failed");
                counter!("fractal_summarize_degraded_total").increment(1);
                GraphOutcome::Failed {
                    error: format!("graph extraction failed: {err}. Re-run summarize to retry."),
                }
            }
        };

        Ok(SummarizeOutcome {
            summary: committed.summary,
            payload,
            graph,
        })
    }

    async fn extract_graph(&self, node_id: &str, summary: &Value) -> Result<GraphUpdate> {
        let prompt = self.assembler.build_graph(node_id, summary)?;
        let reply = self
            .invoke(AgentRole::GraphBuilder, &prompt.system, &prompt.user)
            .await?;
        let extraction = GraphExtraction::parse(&reply)
            .map_err(|e| EngineError::MalformedAgentOutput(format!("graph extraction: {e}")))?;

        let stored = self
            .store
            .store_edges(node_id, &edge_specs(&extraction), None)?;
        Ok(GraphUpdate {
            entities: extraction.entities.len(),
            relations_added: stored.added.len(),
            skipped: stored.skipped,
        })
    }

    /// Merge a branch back into an ancestor.
    ///
    /// The source must be a proper descendant of the target and `active`.
    /// Conflicts are committed alongside the new target summary and returned
    /// for manual handling.
    #[instrument(skip(self), fields(source = source_id, target = target_id))]
    pub async fn merge(&self, source_id: &str, target_id: &str) -> Result<MergeOutcome> {
        if source_id == target_id {
            return Err(EngineError::InvalidState(
                "cannot merge a node into itself".into(),
            ));
        }

        // Lock in id order so concurrent opposing merges cannot deadlock.
        let (first, second) = if source_id <= target_id {
            (source_id, target_id)
        } else {
            (target_id, source_id)
        };
        let first_lock = self.op_lock(first);
        let second_lock = self.op_lock(second);
        let _g1 = first_lock.lock().await;
        let _g2 = second_lock.lock().await;

        let source = self.require(source_id)?;
        let _ = self.require(target_id)?;
        if source.status != "active" {
            return Err(EngineError::InvalidState(format!(
                "merge source {} is {}, not active",
                source.id, source.status
            )));
        }

        // Proper descendant: target appears strictly above source.
        let lineage = self.store.lineage(source_id)?;
        let is_proper_descendant = lineage.iter().skip(1).any(|n| n.id == target_id);
        if !is_proper_descendant {
            return Err(EngineError::InvalidState(format!(
                "source {source_id} is not a proper descendant of target {target_id}"
            )));
        }

        let prompt = self.assembler.build_merge(source_id, target_id)?;
        let reply = self
            .invoke(AgentRole::MergeArbiter, &prompt.system, &prompt.user)
            .await?;
        let verdict = MergeVerdict::parse(&reply)
            .map_err(|e| EngineError::MalformedAgentOutput(format!("merge verdict: {e}")))?;

        let mut summary_value =
            serde_json::to_value(&verdict.updated_target_summary).map_err(StoreError::from)?;
        if !verdict.conflicts.is_empty() {
            // Flagged open question: commit with attached conflict metadata
            // rather than holding the summary pending resolution.
            summary_value["conflicts"] = json!(verdict.conflicts);
        }

        let commit = self.store.merge_commit(&MergeCommitArgs {
            source_id,
            target_id,
            updated_summary: &summary_value,
            conflicts: &verdict.conflicts,
            actor: None,
        })?;

        // Narrate the merge inside the target conversation.
        let facts_text = if verdict.updated_target_summary.facts.is_empty() {
            "\"See summary\"".to_string()
        } else {
            serde_json::to_string(&verdict.updated_target_summary.facts)
                .map_err(StoreError::from)?
        };
        let narration = format!("Merged from {}: {}", source.title, facts_text);
        let _ = self.store.append_message(&AppendMessageArgs {
            node_id: target_id,
            role: "summary",
            content: &narration,
            token_estimate: None,
            agent_used: Some(AgentRole::MergeArbiter.as_str()),
            fallback_from: None,
            actor: None,
        })?;

        counter!("fractal_merges_total").increment(1);
        Ok(MergeOutcome {
            target_id: target_id.to_string(),
            source: commit.source,
            summary: commit.target_summary,
            updated_summary: summary_value,
            conflicts: verdict.conflicts,
            edges_boosted: commit.edges_boosted,
            edges_reattributed: commit.edges_reattributed,
        })
    }

    /// Soft-delete a node (optionally its subtree). The root is never
    /// deletable. No recomputation happens — that is future replay work.
    #[instrument(skip(self), fields(node = node_id, cascade))]
    pub async fn delete(&self, node_id: &str, cascade: bool) -> Result<DeleteOutcome> {
        let lock = self.op_lock(node_id);
        let _guard = lock.lock().await;

        let node = self.require(node_id)?;
        if node.kind == "root" {
            return Err(EngineError::InvalidState(
                "the root node cannot be deleted".into(),
            ));
        }
        if node.status == "deleted" {
            return Err(EngineError::InvalidState(format!(
                "node {node_id} is already deleted"
            )));
        }

        let result = self.store.delete_node(node_id, cascade, None)?;
        let affected_descendants = result
            .deleted_node_ids
            .iter()
            .filter(|id| id.as_str() != node_id)
            .cloned()
            .collect();
        Ok(DeleteOutcome {
            node_id: node_id.to_string(),
            affected_descendants,
            edges_deleted: result.edges_deleted,
            recomputed: false,
        })
    }

    /// Copy a node: duplicated messages, title suffixed for provenance,
    /// latest summary linked by reference.
    #[instrument(skip(self), fields(node = node_id))]
    pub async fn copy(&self, node_id: &str, new_parent_id: Option<&str>) -> Result<CopyOutcome> {
        let lock = self.op_lock(node_id);
        let _guard = lock.lock().await;

        let source = self.require(node_id)?;
        let parent_id = new_parent_id
            .map(String::from)
            .or_else(|| source.parent_id.clone())
            .ok_or_else(|| {
                EngineError::InvalidState("cannot copy the root without a target parent".into())
            })?;
        let parent = self.require(&parent_id)?;
        if parent.status == "deleted" {
            return Err(EngineError::InvalidState(format!(
                "parent {} is deleted",
                parent.id
            )));
        }

        let title = format!("{} (Copy)", source.title);
        let result = self.store.copy_node(&CopyNodeArgs {
            source_id: node_id,
            parent_id: &parent_id,
            title: &title,
            position: None,
            actor: None,
        })?;
        Ok(CopyOutcome {
            node: result.node,
            messages_copied: result.messages_copied,
            summary_ref: result.summary_ref,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Full message history for a node.
    pub fn messages(&self, node_id: &str) -> Result<Vec<MessageRow>> {
        let _ = self.require(node_id)?;
        Ok(self.store.messages(node_id)?)
    }

    /// The ledger for a node.
    pub fn events(&self, node_id: &str) -> Result<Vec<EventRow>> {
        let _ = self.require(node_id)?;
        Ok(self.store.events(node_id)?)
    }

    /// The node's lineage graph as entities + relations.
    pub fn graph(&self, node_id: &str) -> Result<GraphView> {
        let _ = self.require(node_id)?;
        let relations = self.store.lineage_graph(node_id)?;
        let mut entities = Vec::new();
        for edge in &relations {
            for name in [&edge.from_entity, &edge.to_entity] {
                if !entities.contains(name) {
                    entities.push(name.clone());
                }
            }
        }
        Ok(GraphView {
            entities,
            relations,
        })
    }

    /// All non-deleted nodes assembled into subtrees with summary previews.
    pub fn tree(&self) -> Result<Vec<TreeNode>> {
        let nodes = self.store.tree()?;

        let mut previews: HashMap<String, String> = HashMap::new();
        for node in &nodes {
            if let Some(summary) = self.store.latest_summary(&node.id)? {
                if let Some(preview) = summary_preview(&summary.payload) {
                    let _ = previews.insert(node.id.clone(), preview);
                }
            }
        }

        let present: std::collections::HashSet<String> =
            nodes.iter().map(|n| n.id.clone()).collect();
        let mut children_of: HashMap<String, Vec<NodeRow>> = HashMap::new();
        let mut roots = Vec::new();
        for node in nodes {
            match node.parent_id.as_deref() {
                // A deleted/missing parent promotes the subtree to top level.
                Some(parent) if present.contains(parent) => {
                    children_of
                        .entry(parent.to_string())
                        .or_default()
                        .push(node);
                }
                _ => roots.push(node),
            }
        }

        fn build(
            node: NodeRow,
            children_of: &mut HashMap<String, Vec<NodeRow>>,
            previews: &HashMap<String, String>,
        ) -> TreeNode {
            let children = children_of
                .remove(&node.id)
                .unwrap_or_default()
                .into_iter()
                .map(|child| build(child, children_of, previews))
                .collect();
            let summary_text = previews.get(&node.id).cloned();
            TreeNode {
                has_summary: summary_text.is_some(),
                summary_text,
                node,
                children,
            }
        }

        Ok(roots
            .into_iter()
            .map(|root| build(root, &mut children_of, &previews))
            .collect())
    }
}

/// Short human-readable preview of a summary payload: first three facts
/// joined, falling back to truncated raw JSON.
fn summary_preview(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let facts = value
        .get("facts")
        .or_else(|| value.get("FACTS"))
        .and_then(Value::as_array);
    if let Some(facts) = facts {
        let texts: Vec<String> = facts
            .iter()
            .take(3)
            .map(|f| {
                f.get("fact")
                    .and_then(Value::as_str)
                    .map_or_else(|| f.to_string(), String::from)
            })
            .collect();
        if !texts.is_empty() {
            return Some(texts.join("; "));
        }
    }
    let mut raw = value.to_string();
    raw.truncate(200);
    Some(raw)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
