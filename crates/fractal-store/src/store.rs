//! High-level transactional `WorkspaceStore` API.
//!
//! Composes the repositories into atomic, node-centric methods. Every write
//! method runs inside a single SQLite transaction and records exactly one
//! ledger event per mutated node — callers never observe an entity change
//! without its ledger fact, or vice versa.

use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::{Result, StoreError};
use crate::repo::graph::InsertEdgeOptions;
use crate::repo::node::CreateNodeOptions;
use crate::repo::{EventRepo, GraphRepo, MessageRepo, NodeRepo, SummaryRepo};
use crate::row_types::{EdgeRow, EventRow, MessageRow, NodeRow, SummaryRow};

/// Horizontal spacing between siblings on the canvas.
const SIBLING_SPACING_X: f64 = 200.0;
/// Vertical spacing between a parent and its children.
const CHILD_SPACING_Y: f64 = 200.0;

/// Options for creating a node.
pub struct CreateNodeArgs<'a> {
    /// Parent node ID; `None` for the root.
    pub parent_id: Option<&'a str>,
    /// Display title.
    pub title: &'a str,
    /// `root` | `standard` | `exploration`.
    pub kind: &'a str,
    /// Explicit canvas position. When `None`, children are placed at
    /// `(parent.x + siblings * 200, parent.y + 200)` and roots at the origin.
    pub position: Option<(f64, f64)>,
    /// Optional creating actor.
    pub created_by: Option<&'a str>,
}

/// Result of creating a node.
#[derive(Debug)]
pub struct CreateNodeResult {
    /// The created node.
    pub node: NodeRow,
    /// The `created` ledger event.
    pub event: EventRow,
}

/// Options for appending a message.
pub struct AppendMessageArgs<'a> {
    /// Node to append to.
    pub node_id: &'a str,
    /// `user` | `assistant` | `system` | `summary`.
    pub role: &'a str,
    /// Message text.
    pub content: &'a str,
    /// Approximate token count, if estimated.
    pub token_estimate: Option<i64>,
    /// Agent role that produced the message, if any.
    pub agent_used: Option<&'a str>,
    /// Role originally requested when `agent_used` is a fallback.
    pub fallback_from: Option<&'a str>,
    /// Optional actor.
    pub actor: Option<&'a str>,
}

/// Result of appending a message.
#[derive(Debug)]
pub struct AppendMessageResult {
    /// The stored message.
    pub message: MessageRow,
    /// The `message-added` ledger event.
    pub event: EventRow,
}

/// Result of committing a summary.
#[derive(Debug)]
pub struct CommitSummaryResult {
    /// The new latest summary.
    pub summary: SummaryRow,
    /// The `summarized` ledger event it was generated from.
    pub event: EventRow,
}

/// One extracted triple to store.
#[derive(Clone, Debug)]
pub struct EdgeSpec {
    /// Source entity.
    pub from_entity: String,
    /// Target entity.
    pub to_entity: String,
    /// Relation type.
    pub relation_type: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// Result of storing extracted edges.
#[derive(Debug)]
pub struct StoreEdgesResult {
    /// Newly inserted edges.
    pub added: Vec<EdgeRow>,
    /// Triples skipped because an equivalent live edge already exists on
    /// this node.
    pub skipped: usize,
    /// The `graph-updated` ledger event.
    pub event: EventRow,
}

/// Options for committing a merge.
pub struct MergeCommitArgs<'a> {
    /// Node being merged (will be frozen).
    pub source_id: &'a str,
    /// Node receiving the merge.
    pub target_id: &'a str,
    /// The arbiter's updated summary for the target, conflicts included.
    pub updated_summary: &'a Value,
    /// Unresolved conflicts (also embedded in the summary payload).
    pub conflicts: &'a [Value],
    /// Optional actor.
    pub actor: Option<&'a str>,
}

/// Result of committing a merge.
#[derive(Debug)]
pub struct MergeCommitResult {
    /// The target's new latest summary.
    pub target_summary: SummaryRow,
    /// The frozen source node.
    pub source: NodeRow,
    /// Edges moved to the target (provenance preserved).
    pub edges_reattributed: usize,
    /// Source edges folded into an equivalent target-lineage edge.
    pub edges_boosted: usize,
    /// The `merged` event on the target.
    pub target_event: EventRow,
    /// The `merged` event on the source.
    pub source_event: EventRow,
}

/// Result of deleting a node (and optionally its subtree).
#[derive(Debug)]
pub struct DeleteNodeResult {
    /// IDs of nodes marked deleted, the requested node first.
    pub deleted_node_ids: Vec<String>,
    /// Total live edges soft-deleted across those nodes.
    pub edges_deleted: usize,
}

/// Options for copying a node.
pub struct CopyNodeArgs<'a> {
    /// Node to copy.
    pub source_id: &'a str,
    /// Parent for the copy.
    pub parent_id: &'a str,
    /// Title for the copy.
    pub title: &'a str,
    /// Explicit canvas position; defaults like [`CreateNodeArgs::position`].
    pub position: Option<(f64, f64)>,
    /// Optional actor.
    pub actor: Option<&'a str>,
}

/// Result of copying a node.
#[derive(Debug)]
pub struct CopyNodeResult {
    /// The new copy.
    pub node: NodeRow,
    /// How many messages were carried over.
    pub messages_copied: usize,
    /// The source's latest summary ID, referenced (not duplicated) by the copy.
    pub summary_ref: Option<String>,
    /// The `copied` ledger event on the new node.
    pub event: EventRow,
}

/// High-level `WorkspaceStore` wrapping a connection pool and the
/// repositories.
///
/// All write methods are transactional and serialized per node via in-process
/// mutex locks. Mutations that span the tree (delete with cascade, root
/// creation) use a separate global lock. SQLite's partial unique index on
/// `node_summaries` enforces at-most-one-latest at the database level too.
pub struct WorkspaceStore {
    pool: ConnectionPool,
    global_write_lock: Mutex<()>,
    node_write_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl WorkspaceStore {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Create a new `WorkspaceStore` over the given pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            global_write_lock: Mutex::new(()),
            node_write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_global_write(&self) -> Result<MutexGuard<'_, ()>> {
        self.global_write_lock
            .lock()
            .map_err(|_| StoreError::Internal("global write lock poisoned".into()))
    }

    fn acquire_node_write_lock(&self, node_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .node_write_locks
            .lock()
            .map_err(|_| StoreError::Internal("node lock map poisoned".into()))?;

        // Opportunistically prune dead weak refs when the map grows.
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(node_id).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(node_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_node_write_lock<T>(&self, node_id: &str, f: impl FnMut() -> Result<T>) -> Result<T> {
        let node_lock = self.acquire_node_write_lock(node_id)?;
        let _guard = node_lock
            .lock()
            .map_err(|_| StoreError::Internal("node write lock poisoned".into()))?;
        self.retry_on_sqlite_busy(f)
    }

    /// Lock two nodes in ID order so concurrent merges can't deadlock.
    fn with_node_pair_write_lock<T>(
        &self,
        a: &str,
        b: &str,
        f: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let first_lock = self.acquire_node_write_lock(first)?;
        let second_lock = self.acquire_node_write_lock(second)?;
        let _g1 = first_lock
            .lock()
            .map_err(|_| StoreError::Internal("node write lock poisoned".into()))?;
        let _g2 = second_lock
            .lock()
            .map_err(|_| StoreError::Internal("node write lock poisoned".into()))?;
        self.retry_on_sqlite_busy(f)
    }

    fn with_global_write_lock<T>(&self, f: impl FnMut() -> Result<T>) -> Result<T> {
        let _guard = self.lock_global_write()?;
        self.retry_on_sqlite_busy(f)
    }

    /// Retry an operation on SQLite BUSY/LOCKED with linear backoff + jitter.
    ///
    /// Backoff: base = min(attempts * 10, 500) ms, jitter ±25% to prevent
    /// thundering herd when multiple writers contend on the same database.
    #[allow(clippy::unused_self)]
    fn retry_on_sqlite_busy<T>(&self, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err)
                    if Self::is_sqlite_busy_or_locked(&err)
                        && attempts < Self::SQLITE_BUSY_MAX_RETRIES =>
                {
                    attempts += 1;
                    let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_sqlite_busy_or_locked(err: &StoreError) -> bool {
        match err {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => {
                matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn require_node(conn: &Connection, node_id: &str) -> Result<NodeRow> {
        NodeRepo::get_by_id(conn, node_id)?
            .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Node lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a node with its `created` event.
    ///
    /// Atomic: position computation, node insertion, and the ledger event
    /// happen in one transaction. The node row is inserted first because the
    /// event row carries a foreign key to it.
    #[instrument(skip(self, args), fields(parent = args.parent_id, kind = args.kind))]
    pub fn create_node(&self, args: &CreateNodeArgs<'_>) -> Result<CreateNodeResult> {
        let node_id = fractal_core::ids::node_id();
        let run = || -> Result<CreateNodeResult> {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let position = match (args.position, args.parent_id) {
                (Some(pos), _) => pos,
                (None, Some(parent_id)) => {
                    let parent = Self::require_node(&tx, parent_id)?;
                    let siblings = NodeRepo::child_count(&tx, parent_id)?;
                    (
                        parent.position_x + siblings as f64 * SIBLING_SPACING_X,
                        parent.position_y + CHILD_SPACING_Y,
                    )
                }
                (None, None) => (0.0, 0.0),
            };

            let node = NodeRepo::insert(
                &tx,
                &CreateNodeOptions {
                    id: &node_id,
                    parent_id: args.parent_id,
                    title: args.title,
                    kind: args.kind,
                    position,
                    created_by: args.created_by,
                },
            )?;
            let event = EventRepo::insert(
                &tx,
                &node.id,
                "created",
                &json!({
                    "title": args.title,
                    "kind": args.kind,
                    "parentId": args.parent_id,
                }),
                args.created_by,
            )?;

            tx.commit()?;
            Ok(CreateNodeResult { node, event })
        };
        // New ID, nothing to contend with — the parent lock covers sibling
        // counting races.
        match args.parent_id {
            Some(parent_id) => self.with_node_write_lock(parent_id, run),
            None => self.with_global_write_lock(run),
        }
    }

    /// Get or create the root node. Idempotent; used at startup.
    #[instrument(skip(self))]
    pub fn ensure_root(&self, title: &str) -> Result<NodeRow> {
        self.with_global_write_lock(|| {
            let conn = self.conn()?;
            if let Some(root) = NodeRepo::root(&conn)? {
                return Ok(root);
            }
            let tx = conn.unchecked_transaction()?;
            let node_id = fractal_core::ids::node_id();
            let node = NodeRepo::insert(
                &tx,
                &CreateNodeOptions {
                    id: &node_id,
                    parent_id: None,
                    title,
                    kind: "root",
                    position: (0.0, 0.0),
                    created_by: None,
                },
            )?;
            let _ = EventRepo::insert(
                &tx,
                &node.id,
                "created",
                &json!({ "title": title, "kind": "root", "parentId": Value::Null }),
                None,
            )?;
            tx.commit()?;
            debug!(node = %node.id, "created root node");
            Ok(node)
        })
    }

    /// Mark a node deleted, soft-delete its edges, and optionally cascade to
    /// its descendants. One `deleted` event per affected node.
    #[instrument(skip(self), fields(cascade))]
    pub fn delete_node(&self, node_id: &str, cascade: bool, actor: Option<&str>) -> Result<DeleteNodeResult> {
        self.with_global_write_lock(|| {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let node = Self::require_node(&tx, node_id)?;
            let mut targets = vec![node.clone()];
            if cascade {
                targets.extend(NodeRepo::descendants(&tx, node_id)?);
            }

            let mut deleted_node_ids = Vec::with_capacity(targets.len());
            let mut edges_deleted = 0;
            for target in &targets {
                if target.status == "deleted" {
                    continue;
                }
                edges_deleted += GraphRepo::soft_delete_by_owner(&tx, &target.id)?;
                let _ = NodeRepo::update_status(&tx, &target.id, "deleted")?;
                let _ = EventRepo::insert(
                    &tx,
                    &target.id,
                    "deleted",
                    &json!({ "cascade": cascade, "requestedOn": node_id }),
                    actor,
                )?;
                deleted_node_ids.push(target.id.clone());
            }

            tx.commit()?;
            Ok(DeleteNodeResult {
                deleted_node_ids,
                edges_deleted,
            })
        })
    }

    /// Copy a node: new identity, messages duplicated, latest summary carried
    /// by reference in the `copied` event.
    #[instrument(skip(self, args), fields(source = args.source_id))]
    pub fn copy_node(&self, args: &CopyNodeArgs<'_>) -> Result<CopyNodeResult> {
        self.with_node_write_lock(args.parent_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let source = Self::require_node(&tx, args.source_id)?;
            let _ = Self::require_node(&tx, args.parent_id)?;

            let position = match args.position {
                Some(pos) => pos,
                None => {
                    let parent = Self::require_node(&tx, args.parent_id)?;
                    let siblings = NodeRepo::child_count(&tx, args.parent_id)?;
                    (
                        parent.position_x + siblings as f64 * SIBLING_SPACING_X,
                        parent.position_y + CHILD_SPACING_Y,
                    )
                }
            };

            let node_id = fractal_core::ids::node_id();
            let node = NodeRepo::insert(
                &tx,
                &CreateNodeOptions {
                    id: &node_id,
                    parent_id: Some(args.parent_id),
                    title: args.title,
                    kind: &source.kind.replace("root", "standard"),
                    position,
                    created_by: args.actor,
                },
            )?;

            let mut messages_copied = 0;
            for message in MessageRepo::by_node(&tx, args.source_id)? {
                let _ = MessageRepo::insert(
                    &tx,
                    &node.id,
                    &message.role,
                    &message.content,
                    message.token_estimate,
                )?;
                messages_copied += 1;
            }

            let summary_ref = SummaryRepo::latest(&tx, args.source_id)?.map(|s| s.id);
            let event = EventRepo::insert(
                &tx,
                &node.id,
                "copied",
                &json!({
                    "copiedFrom": args.source_id,
                    "summaryRef": summary_ref,
                    "messagesCopied": messages_copied,
                }),
                args.actor,
            )?;

            tx.commit()?;
            Ok(CopyNodeResult {
                node,
                messages_copied,
                summary_ref,
                event,
            })
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Messages and summaries
    // ─────────────────────────────────────────────────────────────────────

    /// Append a message with its `message-added` event.
    #[instrument(skip(self, args), fields(node = args.node_id, role = args.role))]
    pub fn append_message(&self, args: &AppendMessageArgs<'_>) -> Result<AppendMessageResult> {
        self.with_node_write_lock(args.node_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let _ = Self::require_node(&tx, args.node_id)?;
            let message = MessageRepo::insert(
                &tx,
                args.node_id,
                args.role,
                args.content,
                args.token_estimate,
            )?;
            let event = EventRepo::insert(
                &tx,
                args.node_id,
                "message-added",
                &json!({
                    "messageId": message.id,
                    "role": args.role,
                    "agentUsed": args.agent_used,
                    "fallbackFrom": args.fallback_from,
                }),
                args.actor,
            )?;

            tx.commit()?;
            Ok(AppendMessageResult { message, event })
        })
    }

    /// Commit a new latest summary with its `summarized` event.
    ///
    /// Demote-then-insert runs in one transaction under the node lock, so a
    /// node never has two latest summaries even under concurrent callers.
    #[instrument(skip(self, payload), fields(node = node_id))]
    pub fn commit_summary(
        &self,
        node_id: &str,
        payload: &Value,
        trigger: Option<&str>,
        actor: Option<&str>,
    ) -> Result<CommitSummaryResult> {
        self.with_node_write_lock(node_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let _ = Self::require_node(&tx, node_id)?;
            let event = EventRepo::insert(
                &tx,
                node_id,
                "summarized",
                &json!({ "trigger": trigger }),
                actor,
            )?;
            let _ = SummaryRepo::demote_latest(&tx, node_id)?;
            let summary =
                SummaryRepo::insert_latest(&tx, node_id, &payload.to_string(), Some(&event.id))?;

            tx.commit()?;
            Ok(CommitSummaryResult { summary, event })
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Graph
    // ─────────────────────────────────────────────────────────────────────

    /// Store extracted triples for a node with one `graph-updated` event.
    ///
    /// Triples that already exist live on this node (same from/to/relation)
    /// are skipped, not duplicated.
    #[instrument(skip(self, edges), fields(node = node_id, count = edges.len()))]
    pub fn store_edges(
        &self,
        node_id: &str,
        edges: &[EdgeSpec],
        actor: Option<&str>,
    ) -> Result<StoreEdgesResult> {
        self.with_node_write_lock(node_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let _ = Self::require_node(&tx, node_id)?;
            let owner = vec![node_id.to_string()];
            let mut added = Vec::new();
            let mut skipped = 0;
            for spec in edges {
                let existing = GraphRepo::find_equivalent(
                    &tx,
                    &spec.from_entity,
                    &spec.to_entity,
                    &spec.relation_type,
                    &owner,
                )?;
                if existing.is_some() {
                    skipped += 1;
                    continue;
                }
                added.push(GraphRepo::insert(
                    &tx,
                    &InsertEdgeOptions {
                        from_entity: &spec.from_entity,
                        to_entity: &spec.to_entity,
                        relation_type: &spec.relation_type,
                        owner_node: node_id,
                        provenance_node: node_id,
                        confidence: spec.confidence,
                    },
                )?);
            }

            let event = EventRepo::insert(
                &tx,
                node_id,
                "graph-updated",
                &json!({ "added": added.len(), "skipped": skipped }),
                actor,
            )?;

            tx.commit()?;
            Ok(StoreEdgesResult {
                added,
                skipped,
                event,
            })
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Merge
    // ─────────────────────────────────────────────────────────────────────

    /// Commit a merge: new target summary, source frozen, source edges folded
    /// into the target, `merged` events on both nodes. Atomic.
    ///
    /// Edge folding: a source edge whose triple already exists live anywhere
    /// on the target's lineage boosts that edge's confidence (max of the two)
    /// and is soft-deleted; otherwise the edge moves to the target with its
    /// `provenance_node` untouched.
    #[instrument(skip(self, args), fields(source = args.source_id, target = args.target_id))]
    pub fn merge_commit(&self, args: &MergeCommitArgs<'_>) -> Result<MergeCommitResult> {
        if args.source_id == args.target_id {
            return Err(StoreError::InvalidOperation(
                "cannot merge a node into itself".into(),
            ));
        }
        self.with_node_pair_write_lock(args.source_id, args.target_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;

            let source = Self::require_node(&tx, args.source_id)?;
            let _ = Self::require_node(&tx, args.target_id)?;

            // Target side: merged event, then the arbiter's summary.
            let target_event = EventRepo::insert(
                &tx,
                args.target_id,
                "merged",
                &json!({
                    "direction": "incoming",
                    "sourceNode": args.source_id,
                    "conflicts": args.conflicts.len(),
                }),
                args.actor,
            )?;
            let _ = SummaryRepo::demote_latest(&tx, args.target_id)?;
            let target_summary = SummaryRepo::insert_latest(
                &tx,
                args.target_id,
                &args.updated_summary.to_string(),
                Some(&target_event.id),
            )?;

            // Fold source edges into the target lineage.
            let lineage_ids: Vec<String> = NodeRepo::lineage(&tx, args.target_id)?
                .into_iter()
                .map(|n| n.id)
                .collect();
            let mut edges_reattributed = 0;
            let mut edges_boosted = 0;
            for edge in GraphRepo::by_owner(&tx, args.source_id)? {
                let equivalent = GraphRepo::find_equivalent(
                    &tx,
                    &edge.from_entity,
                    &edge.to_entity,
                    &edge.relation_type,
                    &lineage_ids,
                )?;
                if let Some(existing) = equivalent {
                    let _ = GraphRepo::update_confidence(
                        &tx,
                        &existing.id,
                        existing.confidence.max(edge.confidence),
                    )?;
                    let _ = GraphRepo::soft_delete(&tx, &edge.id)?;
                    edges_boosted += 1;
                } else {
                    let _ = GraphRepo::reattribute(&tx, &edge.id, args.target_id)?;
                    edges_reattributed += 1;
                }
            }

            // Source side: freeze with its own ledger fact.
            let _ = NodeRepo::update_status(&tx, args.source_id, "frozen")?;
            let source_event = EventRepo::insert(
                &tx,
                args.source_id,
                "merged",
                &json!({ "direction": "outgoing", "mergedInto": args.target_id }),
                args.actor,
            )?;

            tx.commit()?;
            debug!(
                boosted = edges_boosted,
                reattributed = edges_reattributed,
                "merge committed"
            );
            Ok(MergeCommitResult {
                target_summary,
                source: NodeRow {
                    status: "frozen".to_string(),
                    ..source
                },
                edges_reattributed,
                edges_boosted,
                target_event,
                source_event,
            })
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Get a node by ID, or `NodeNotFound`.
    pub fn node(&self, node_id: &str) -> Result<NodeRow> {
        let conn = self.conn()?;
        Self::require_node(&conn, node_id)
    }

    /// The root node, if one exists.
    pub fn root(&self) -> Result<Option<NodeRow>> {
        let conn = self.conn()?;
        NodeRepo::root(&conn)
    }

    /// All non-deleted nodes.
    pub fn tree(&self) -> Result<Vec<NodeRow>> {
        let conn = self.conn()?;
        NodeRepo::tree(&conn)
    }

    /// `[node, parent, …, root]`.
    pub fn lineage(&self, node_id: &str) -> Result<Vec<NodeRow>> {
        let conn = self.conn()?;
        let _ = Self::require_node(&conn, node_id)?;
        NodeRepo::lineage(&conn, node_id)
    }

    /// Direct children in creation order.
    pub fn children(&self, node_id: &str) -> Result<Vec<NodeRow>> {
        let conn = self.conn()?;
        NodeRepo::children(&conn, node_id)
    }

    /// All descendants of a node.
    pub fn descendants(&self, node_id: &str) -> Result<Vec<NodeRow>> {
        let conn = self.conn()?;
        NodeRepo::descendants(&conn, node_id)
    }

    /// Full message history, oldest first.
    pub fn messages(&self, node_id: &str) -> Result<Vec<MessageRow>> {
        let conn = self.conn()?;
        let _ = Self::require_node(&conn, node_id)?;
        MessageRepo::by_node(&conn, node_id)
    }

    /// The last `n` messages in chronological order.
    pub fn last_messages(&self, node_id: &str, n: usize) -> Result<Vec<MessageRow>> {
        let conn = self.conn()?;
        MessageRepo::last_n(&conn, node_id, n)
    }

    /// The latest summary, if any.
    pub fn latest_summary(&self, node_id: &str) -> Result<Option<SummaryRow>> {
        let conn = self.conn()?;
        SummaryRepo::latest(&conn, node_id)
    }

    /// Full summary history, oldest first.
    pub fn summary_history(&self, node_id: &str) -> Result<Vec<SummaryRow>> {
        let conn = self.conn()?;
        SummaryRepo::by_node(&conn, node_id)
    }

    /// The ledger for one node, oldest first.
    pub fn events(&self, node_id: &str) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        let _ = Self::require_node(&conn, node_id)?;
        EventRepo::by_node(&conn, node_id)
    }

    /// Live edges owned by one node.
    pub fn node_graph(&self, node_id: &str) -> Result<Vec<EdgeRow>> {
        let conn = self.conn()?;
        let _ = Self::require_node(&conn, node_id)?;
        GraphRepo::by_owner(&conn, node_id)
    }

    /// Live edges owned by any node on the lineage (node → root).
    pub fn lineage_graph(&self, node_id: &str) -> Result<Vec<EdgeRow>> {
        let conn = self.conn()?;
        let _ = Self::require_node(&conn, node_id)?;
        let lineage_ids: Vec<String> = NodeRepo::lineage(&conn, node_id)?
            .into_iter()
            .map(|n| n.id)
            .collect();
        GraphRepo::by_owners(&conn, &lineage_ids)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::connection::{new_in_memory, ConnectionConfig};
    use crate::migrations::run_migrations;

    fn setup() -> WorkspaceStore {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        WorkspaceStore::new(pool)
    }

    fn create_child(store: &WorkspaceStore, parent: &str, title: &str) -> NodeRow {
        store
            .create_node(&CreateNodeArgs {
                parent_id: Some(parent),
                title,
                kind: "standard",
                position: None,
                created_by: None,
            })
            .unwrap()
            .node
    }

    #[test]
    fn ensure_root_is_idempotent() {
        let store = setup();
        let a = store.ensure_root("Workspace").unwrap();
        let b = store.ensure_root("Workspace").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.kind, "root");
        assert_eq!(store.events(&a.id).unwrap().len(), 1);
    }

    #[test]
    fn create_node_pairs_row_with_event() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let child = create_child(&store, &root.id, "idea");

        let events = store.events(&child.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "created");
        let payload: Value = serde_json::from_str(&events[0].payload).unwrap();
        assert_eq!(payload["parentId"], root.id.as_str());
    }

    #[test]
    fn create_node_missing_parent() {
        let store = setup();
        let err = store
            .create_node(&CreateNodeArgs {
                parent_id: Some("node_missing"),
                title: "x",
                kind: "standard",
                position: None,
                created_by: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound(_)));
        // The failed transaction left no orphan event behind.
    }

    #[test]
    fn children_fan_out_horizontally() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let a = create_child(&store, &root.id, "a");
        let b = create_child(&store, &root.id, "b");

        assert!((a.position_x - root.position_x).abs() < f64::EPSILON);
        assert!((a.position_y - (root.position_y + 200.0)).abs() < f64::EPSILON);
        assert!((b.position_x - (root.position_x + 200.0)).abs() < f64::EPSILON);
        assert!((b.position_y - a.position_y).abs() < f64::EPSILON);
    }

    #[test]
    fn append_message_records_event_with_agent_attribution() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let result = store
            .append_message(&AppendMessageArgs {
                node_id: &root.id,
                role: "assistant",
                content: "answer",
                token_estimate: Some(2),
                agent_used: Some("reasoner"),
                fallback_from: Some("explorer"),
                actor: None,
            })
            .unwrap();

        let payload: Value = serde_json::from_str(&result.event.payload).unwrap();
        assert_eq!(payload["agentUsed"], "reasoner");
        assert_eq!(payload["fallbackFrom"], "explorer");
        assert_eq!(payload["messageId"], result.message.id.as_str());
    }

    #[test]
    fn append_message_missing_node() {
        let store = setup();
        let err = store
            .append_message(&AppendMessageArgs {
                node_id: "node_missing",
                role: "user",
                content: "x",
                token_estimate: None,
                agent_used: None,
                fallback_from: None,
                actor: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound(_)));
    }

    #[test]
    fn commit_summary_replaces_latest_and_links_event() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let first = store
            .commit_summary(&root.id, &serde_json::json!({"v": 1}), Some("manual"), None)
            .unwrap();
        let second = store
            .commit_summary(&root.id, &serde_json::json!({"v": 2}), Some("manual"), None)
            .unwrap();

        assert_eq!(
            second.summary.generated_from_event.as_deref(),
            Some(second.event.id.as_str())
        );
        let latest = store.latest_summary(&root.id).unwrap().unwrap();
        assert_eq!(latest.id, second.summary.id);
        assert_ne!(latest.id, first.summary.id);
        assert_eq!(store.summary_history(&root.id).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_summaries_keep_single_latest() {
        let store = Arc::new(setup());
        let root = store.ensure_root("root").unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let node_id = root.id.clone();
            handles.push(std::thread::spawn(move || {
                store
                    .commit_summary(&node_id, &serde_json::json!({ "v": i }), None, None)
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.summary_history(&root.id).unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history.iter().filter(|s| s.is_latest).count(), 1);
    }

    #[test]
    fn store_edges_skips_duplicates() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let spec = EdgeSpec {
            from_entity: "Rust".into(),
            to_entity: "Safety".into(),
            relation_type: "PROVIDES".into(),
            confidence: 0.9,
        };
        let first = store.store_edges(&root.id, &[spec.clone()], None).unwrap();
        assert_eq!(first.added.len(), 1);
        assert_eq!(first.skipped, 0);

        let second = store.store_edges(&root.id, &[spec], None).unwrap();
        assert_eq!(second.added.len(), 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.node_graph(&root.id).unwrap().len(), 1);
    }

    #[test]
    fn merge_commit_freezes_source_and_folds_edges() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let child = create_child(&store, &root.id, "branch");

        // Shared triple on the target, unique triple on the source.
        store
            .store_edges(
                &root.id,
                &[EdgeSpec {
                    from_entity: "A".into(),
                    to_entity: "B".into(),
                    relation_type: "USES".into(),
                    confidence: 0.5,
                }],
                None,
            )
            .unwrap();
        store
            .store_edges(
                &child.id,
                &[
                    EdgeSpec {
                        from_entity: "A".into(),
                        to_entity: "B".into(),
                        relation_type: "USES".into(),
                        confidence: 0.9,
                    },
                    EdgeSpec {
                        from_entity: "C".into(),
                        to_entity: "D".into(),
                        relation_type: "NEEDS".into(),
                        confidence: 0.7,
                    },
                ],
                None,
            )
            .unwrap();

        let result = store
            .merge_commit(&MergeCommitArgs {
                source_id: &child.id,
                target_id: &root.id,
                updated_summary: &serde_json::json!({"merged": true}),
                conflicts: &[],
                actor: None,
            })
            .unwrap();

        assert_eq!(result.edges_boosted, 1);
        assert_eq!(result.edges_reattributed, 1);
        assert_eq!(store.node(&child.id).unwrap().status, "frozen");

        let target_edges = store.node_graph(&root.id).unwrap();
        assert_eq!(target_edges.len(), 2);
        let boosted = target_edges
            .iter()
            .find(|e| e.from_entity == "A")
            .unwrap();
        assert!((boosted.confidence - 0.9).abs() < f64::EPSILON);
        let moved = target_edges.iter().find(|e| e.from_entity == "C").unwrap();
        assert_eq!(moved.provenance_node, child.id);

        assert!(store.node_graph(&child.id).unwrap().is_empty());
        assert_eq!(
            store.latest_summary(&root.id).unwrap().unwrap().payload,
            r#"{"merged":true}"#
        );
        assert_eq!(store.events(&child.id).unwrap().last().unwrap().kind, "merged");
        assert_eq!(store.events(&root.id).unwrap().last().unwrap().kind, "merged");
    }

    #[test]
    fn frozen_source_can_restore_triple_folded_by_merge() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let child = create_child(&store, &root.id, "branch");
        let spec = EdgeSpec {
            from_entity: "A".into(),
            to_entity: "B".into(),
            relation_type: "USES".into(),
            confidence: 0.8,
        };
        store.store_edges(&root.id, &[spec.clone()], None).unwrap();
        store.store_edges(&child.id, &[spec.clone()], None).unwrap();

        let result = store
            .merge_commit(&MergeCommitArgs {
                source_id: &child.id,
                target_id: &root.id,
                updated_summary: &serde_json::json!({"merged": true}),
                conflicts: &[],
                actor: None,
            })
            .unwrap();
        assert_eq!(result.edges_boosted, 1);

        // Re-summarizing the frozen source re-emits the same triple. The
        // soft-deleted copy left behind by the boost must not block it.
        let restored = store.store_edges(&child.id, &[spec], None).unwrap();
        assert_eq!(restored.added.len(), 1);
        assert_eq!(restored.skipped, 0);
        assert_eq!(store.node_graph(&child.id).unwrap().len(), 1);
    }

    #[test]
    fn merge_reattributes_over_targets_soft_deleted_edge() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let child = create_child(&store, &root.id, "branch");
        let spec = EdgeSpec {
            from_entity: "A".into(),
            to_entity: "B".into(),
            relation_type: "USES".into(),
            confidence: 0.6,
        };
        let stored = store.store_edges(&root.id, &[spec.clone()], None).unwrap();
        {
            let conn = store.conn().unwrap();
            assert!(GraphRepo::soft_delete(&conn, &stored.added[0].id).unwrap());
        }
        store.store_edges(&child.id, &[spec], None).unwrap();

        // No live equivalent on the target lineage, so the source edge moves
        // to the target even though a ghost of the same triple sits there.
        let result = store
            .merge_commit(&MergeCommitArgs {
                source_id: &child.id,
                target_id: &root.id,
                updated_summary: &serde_json::json!({"merged": true}),
                conflicts: &[],
                actor: None,
            })
            .unwrap();
        assert_eq!(result.edges_reattributed, 1);
        assert_eq!(result.edges_boosted, 0);

        let target_edges = store.node_graph(&root.id).unwrap();
        assert_eq!(target_edges.len(), 1);
        assert_eq!(target_edges[0].provenance_node, child.id);
    }

    #[test]
    fn merge_into_self_rejected() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let err = store
            .merge_commit(&MergeCommitArgs {
                source_id: &root.id,
                target_id: &root.id,
                updated_summary: &serde_json::json!({}),
                conflicts: &[],
                actor: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidOperation(_)));
    }

    #[test]
    fn delete_without_cascade_leaves_children() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let a = create_child(&store, &root.id, "a");
        let b = create_child(&store, &a.id, "b");

        let result = store.delete_node(&a.id, false, None).unwrap();
        assert_eq!(result.deleted_node_ids, vec![a.id.clone()]);
        assert_eq!(store.node(&b.id).unwrap().status, "active");
        assert!(!store.tree().unwrap().iter().any(|n| n.id == a.id));
    }

    #[test]
    fn delete_with_cascade_marks_subtree_and_edges() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let a = create_child(&store, &root.id, "a");
        let b = create_child(&store, &a.id, "b");
        store
            .store_edges(
                &b.id,
                &[EdgeSpec {
                    from_entity: "X".into(),
                    to_entity: "Y".into(),
                    relation_type: "USES".into(),
                    confidence: 1.0,
                }],
                None,
            )
            .unwrap();

        let result = store.delete_node(&a.id, true, None).unwrap();
        assert_eq!(result.deleted_node_ids.len(), 2);
        assert_eq!(result.edges_deleted, 1);
        assert_eq!(store.node(&b.id).unwrap().status, "deleted");

        // Lineage reads from surviving nodes no longer see b's edges.
        assert!(store.node_graph(&b.id).unwrap().is_empty());
    }

    #[test]
    fn copy_node_duplicates_messages_and_references_summary() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let source = create_child(&store, &root.id, "source");
        store
            .append_message(&AppendMessageArgs {
                node_id: &source.id,
                role: "user",
                content: "hello",
                token_estimate: None,
                agent_used: None,
                fallback_from: None,
                actor: None,
            })
            .unwrap();
        let summary = store
            .commit_summary(&source.id, &serde_json::json!({"v": 1}), None, None)
            .unwrap();

        let copy = store
            .copy_node(&CopyNodeArgs {
                source_id: &source.id,
                parent_id: &root.id,
                title: "source (Copy)",
                position: None,
                actor: None,
            })
            .unwrap();

        assert_eq!(copy.messages_copied, 1);
        assert_eq!(copy.summary_ref.as_deref(), Some(summary.summary.id.as_str()));
        assert_eq!(store.messages(&copy.node.id).unwrap().len(), 1);
        // The copy carries a reference, not a duplicated summary row.
        assert!(store.latest_summary(&copy.node.id).unwrap().is_none());

        let events = store.events(&copy.node.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "copied");
    }

    #[test]
    fn lineage_graph_spans_node_to_root() {
        let store = setup();
        let root = store.ensure_root("root").unwrap();
        let child = create_child(&store, &root.id, "child");
        store
            .store_edges(
                &root.id,
                &[EdgeSpec {
                    from_entity: "R1".into(),
                    to_entity: "R2".into(),
                    relation_type: "USES".into(),
                    confidence: 1.0,
                }],
                None,
            )
            .unwrap();
        store
            .store_edges(
                &child.id,
                &[EdgeSpec {
                    from_entity: "C1".into(),
                    to_entity: "C2".into(),
                    relation_type: "USES".into(),
                    confidence: 1.0,
                }],
                None,
            )
            .unwrap();

        assert_eq!(store.lineage_graph(&child.id).unwrap().len(), 2);
        assert_eq!(store.lineage_graph(&root.id).unwrap().len(), 1);
    }

    #[test]
    fn events_missing_node() {
        let store = setup();
        assert!(matches!(
            store.events("node_missing").unwrap_err(),
            StoreError::NodeNotFound(_)
        ));
    }
}
