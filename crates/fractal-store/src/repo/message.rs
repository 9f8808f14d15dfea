//! Message repository — append-only utterances within a node.
//!
//! Ordering is by timestamp with rowid as the tiebreaker, so same-millisecond
//! inserts keep their insertion order.

use rusqlite::{params, Connection, Row};

use crate::errors::Result;
use crate::row_types::MessageRow;

fn map_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        node_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        timestamp: row.get(4)?,
        token_estimate: row.get(5)?,
    })
}

const COLS: &str = "id, node_id, role, content, timestamp, token_estimate";

/// Message repository — stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    /// Append a message.
    pub fn insert(
        conn: &Connection,
        node_id: &str,
        role: &str,
        content: &str,
        token_estimate: Option<i64>,
    ) -> Result<MessageRow> {
        let id = fractal_core::ids::message_id();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO messages (id, node_id, role, content, timestamp, token_estimate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, node_id, role, content, now, token_estimate],
        )?;
        Ok(MessageRow {
            id,
            node_id: node_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: now,
            token_estimate,
        })
    }

    /// Full history for a node, oldest first.
    pub fn by_node(conn: &Connection, node_id: &str) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM messages WHERE node_id = ?1 ORDER BY timestamp, rowid"
        ))?;
        let rows = stmt
            .query_map(params![node_id], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The last `n` messages, returned in chronological order.
    pub fn last_n(conn: &Connection, node_id: &str, n: usize) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM messages WHERE node_id = ?1 ORDER BY timestamp DESC, rowid DESC LIMIT ?2"
        ))?;
        let mut rows = stmt
            .query_map(params![node_id, n as i64], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.reverse();
        Ok(rows)
    }

    /// Count messages for a node.
    pub fn count_by_node(conn: &Connection, node_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE node_id = ?1",
            params![node_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::repo::node::{CreateNodeOptions, NodeRepo};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        NodeRepo::insert(
            &conn,
            &CreateNodeOptions {
                id: "node_1",
                parent_id: None,
                title: "root",
                kind: "root",
                position: (0.0, 0.0),
                created_by: None,
            },
        )
        .unwrap();
        conn
    }

    #[test]
    fn insert_and_list() {
        let conn = setup();
        let msg = MessageRepo::insert(&conn, "node_1", "user", "hello", Some(2)).unwrap();
        assert!(msg.id.starts_with("msg_"));

        let msgs = MessageRepo::by_node(&conn, "node_1").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].content, "hello");
        assert_eq!(msgs[0].token_estimate, Some(2));
    }

    #[test]
    fn history_is_chronological_with_stable_ties() {
        let conn = setup();
        for i in 0..5 {
            MessageRepo::insert(&conn, "node_1", "user", &format!("m{i}"), None).unwrap();
        }
        let msgs = MessageRepo::by_node(&conn, "node_1").unwrap();
        let contents: Vec<&str> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn last_n_returns_tail_in_order() {
        let conn = setup();
        for i in 0..5 {
            MessageRepo::insert(&conn, "node_1", "user", &format!("m{i}"), None).unwrap();
        }
        let tail = MessageRepo::last_n(&conn, "node_1", 2).unwrap();
        let contents: Vec<&str> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[test]
    fn last_n_larger_than_history() {
        let conn = setup();
        MessageRepo::insert(&conn, "node_1", "user", "only", None).unwrap();
        assert_eq!(MessageRepo::last_n(&conn, "node_1", 10).unwrap().len(), 1);
    }

    #[test]
    fn count_by_node() {
        let conn = setup();
        assert_eq!(MessageRepo::count_by_node(&conn, "node_1").unwrap(), 0);
        MessageRepo::insert(&conn, "node_1", "user", "hello", None).unwrap();
        assert_eq!(MessageRepo::count_by_node(&conn, "node_1").unwrap(), 1);
    }

    #[test]
    fn insert_for_missing_node_fails() {
        let conn = setup();
        assert!(MessageRepo::insert(&conn, "node_missing", "user", "x", None).is_err());
    }
}
