//! Prefixed entity identifiers.
//!
//! Every entity ID is a UUID v7 with a short type prefix (`node_`, `evt_`,
//! `msg_`, `sum_`, `edge_`). The v7 timestamp bits keep IDs roughly sortable
//! by creation time, which makes ledger scans and log output readable.

use uuid::Uuid;

/// New node ID (`node_{uuid7}`).
pub fn node_id() -> String {
    format!("node_{}", Uuid::now_v7())
}

/// New ledger event ID (`evt_{uuid7}`).
pub fn event_id() -> String {
    format!("evt_{}", Uuid::now_v7())
}

/// New message ID (`msg_{uuid7}`).
pub fn message_id() -> String {
    format!("msg_{}", Uuid::now_v7())
}

/// New summary ID (`sum_{uuid7}`).
pub fn summary_id() -> String {
    format!("sum_{}", Uuid::now_v7())
}

/// New knowledge-graph edge ID (`edge_{uuid7}`).
pub fn edge_id() -> String {
    format!("edge_{}", Uuid::now_v7())
}
