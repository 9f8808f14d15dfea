//! Event repository — the append-only ledger table.
//!
//! INVARIANT: `node_events` rows are never updated or deleted. This module
//! intentionally exposes no mutating method other than `insert`.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::errors::Result;
use crate::row_types::EventRow;

fn map_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        node_id: row.get(1)?,
        kind: row.get(2)?,
        payload: row.get(3)?,
        timestamp: row.get(4)?,
        actor: row.get(5)?,
    })
}

const COLS: &str = "id, node_id, kind, payload, timestamp, actor";

/// Event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Append one event. Never rejects on business rules — preconditions are
    /// the orchestrator's job.
    pub fn insert(
        conn: &Connection,
        node_id: &str,
        kind: &str,
        payload: &Value,
        actor: Option<&str>,
    ) -> Result<EventRow> {
        let id = fractal_core::ids::event_id();
        let now = chrono::Utc::now().to_rfc3339();
        let payload_text = payload.to_string();
        let _ = conn.execute(
            "INSERT INTO node_events (id, node_id, kind, payload, timestamp, actor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, node_id, kind, payload_text, now, actor],
        )?;
        Ok(EventRow {
            id,
            node_id: node_id.to_string(),
            kind: kind.to_string(),
            payload: payload_text,
            timestamp: now,
            actor: actor.map(String::from),
        })
    }

    /// Get an event by ID.
    pub fn get_by_id(conn: &Connection, event_id: &str) -> Result<Option<EventRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLS} FROM node_events WHERE id = ?1"),
                params![event_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All events for a node, oldest first (ties broken by insertion order).
    pub fn by_node(conn: &Connection, node_id: &str) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM node_events WHERE node_id = ?1 ORDER BY timestamp, rowid"
        ))?;
        let rows = stmt
            .query_map(params![node_id], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All events of a kind, oldest first.
    pub fn by_kind(conn: &Connection, kind: &str) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM node_events WHERE kind = ?1 ORDER BY timestamp, rowid"
        ))?;
        let rows = stmt
            .query_map(params![kind], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count events for a node.
    pub fn count_by_node(conn: &Connection, node_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM node_events WHERE node_id = ?1",
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
    use serde_json::json;

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
    fn insert_and_get() {
        let conn = setup();
        let event =
            EventRepo::insert(&conn, "node_1", "created", &json!({"title": "root"}), None).unwrap();
        assert!(event.id.starts_with("evt_"));

        let found = EventRepo::get_by_id(&conn, &event.id).unwrap().unwrap();
        assert_eq!(found.kind, "created");
        assert_eq!(found.payload, r#"{"title":"root"}"#);
    }

    #[test]
    fn insert_with_actor() {
        let conn = setup();
        let event =
            EventRepo::insert(&conn, "node_1", "created", &json!({}), Some("tester")).unwrap();
        assert_eq!(event.actor.as_deref(), Some("tester"));
    }

    #[test]
    fn insert_for_missing_node_fails() {
        let conn = setup();
        let result = EventRepo::insert(&conn, "node_missing", "created", &json!({}), None);
        assert!(result.is_err());
    }

    #[test]
    fn by_node_ordered() {
        let conn = setup();
        let e1 = EventRepo::insert(&conn, "node_1", "created", &json!({}), None).unwrap();
        let e2 = EventRepo::insert(&conn, "node_1", "message-added", &json!({}), None).unwrap();

        let events = EventRepo::by_node(&conn, "node_1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, e1.id);
        assert_eq!(events[1].id, e2.id);
    }

    #[test]
    fn by_kind_filters() {
        let conn = setup();
        EventRepo::insert(&conn, "node_1", "created", &json!({}), None).unwrap();
        EventRepo::insert(&conn, "node_1", "message-added", &json!({}), None).unwrap();
        EventRepo::insert(&conn, "node_1", "message-added", &json!({}), None).unwrap();

        assert_eq!(EventRepo::by_kind(&conn, "message-added").unwrap().len(), 2);
        assert_eq!(EventRepo::by_kind(&conn, "merged").unwrap().len(), 0);
    }

    #[test]
    fn count_by_node() {
        let conn = setup();
        assert_eq!(EventRepo::count_by_node(&conn, "node_1").unwrap(), 0);
        EventRepo::insert(&conn, "node_1", "created", &json!({}), None).unwrap();
        assert_eq!(EventRepo::count_by_node(&conn, "node_1").unwrap(), 1);
    }
}
