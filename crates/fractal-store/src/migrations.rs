//! Schema migrations.
//!
//! `run_migrations` is idempotent (`IF NOT EXISTS` everywhere) and runs at
//! startup on every pool. Schema notes:
//!
//! - `nodes.parent_id` is self-referential; NULL only for the root.
//! - `node_events` is append-only — there is no UPDATE or DELETE path
//!   anywhere in this crate.
//! - `node_summaries.is_latest` has a partial unique index so the database
//!   itself enforces at-most-one-latest per node.
//! - `graph_edges` carries both `owner_node` (who the edge belongs to now)
//!   and `provenance_node` (who originally contributed it — preserved when
//!   a merge re-attributes the edge). Triple uniqueness per owner is a
//!   partial index over live rows only, so soft-deleted ghosts never block
//!   re-insertion or re-attribution of the same triple.

use rusqlite::Connection;

use crate::errors::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id          TEXT PRIMARY KEY,
    parent_id   TEXT REFERENCES nodes(id),
    title       TEXT NOT NULL,
    kind        TEXT NOT NULL DEFAULT 'standard',
    status      TEXT NOT NULL DEFAULT 'active',
    position_x  REAL NOT NULL DEFAULT 0,
    position_y  REAL NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    created_by  TEXT
);
CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);

CREATE TABLE IF NOT EXISTS node_events (
    id         TEXT PRIMARY KEY,
    node_id    TEXT NOT NULL REFERENCES nodes(id),
    kind       TEXT NOT NULL,
    payload    TEXT NOT NULL,
    timestamp  TEXT NOT NULL,
    actor      TEXT
);
CREATE INDEX IF NOT EXISTS idx_events_node ON node_events(node_id);
CREATE INDEX IF NOT EXISTS idx_events_kind ON node_events(kind);

CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY,
    node_id         TEXT NOT NULL REFERENCES nodes(id),
    role            TEXT NOT NULL,
    content         TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    token_estimate  INTEGER
);
CREATE INDEX IF NOT EXISTS idx_messages_node ON messages(node_id);

CREATE TABLE IF NOT EXISTS node_summaries (
    id                    TEXT PRIMARY KEY,
    node_id               TEXT NOT NULL REFERENCES nodes(id),
    payload               TEXT NOT NULL,
    generated_from_event  TEXT REFERENCES node_events(id),
    created_at            TEXT NOT NULL,
    is_latest             INTEGER NOT NULL DEFAULT 1
);
CREATE UNIQUE INDEX IF NOT EXISTS uix_summary_latest
    ON node_summaries(node_id) WHERE is_latest = 1;

CREATE TABLE IF NOT EXISTS graph_edges (
    id               TEXT PRIMARY KEY,
    from_entity      TEXT NOT NULL,
    to_entity        TEXT NOT NULL,
    relation_type    TEXT NOT NULL,
    owner_node       TEXT NOT NULL REFERENCES nodes(id),
    provenance_node  TEXT NOT NULL,
    confidence       REAL NOT NULL DEFAULT 1.0,
    created_at       TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS uix_edge_triple_live
    ON graph_edges(from_entity, to_entity, relation_type, owner_node)
    WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_edges_owner ON graph_edges(owner_node);
";

/// Create all tables and indexes if they don't exist.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
