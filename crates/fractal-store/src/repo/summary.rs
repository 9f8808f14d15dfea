//! Summary repository — versioned distillations with an at-most-one-latest
//! invariant.
//!
//! `demote_latest` + `insert_latest` must run in the same transaction (and
//! under the owning node's write lock); [`crate::store`] enforces that. The
//! partial unique index on `(node_id) WHERE is_latest = 1` backstops the
//! invariant at the database level.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::Result;
use crate::row_types::SummaryRow;

fn map_row(row: &Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        id: row.get(0)?,
        node_id: row.get(1)?,
        payload: row.get(2)?,
        generated_from_event: row.get(3)?,
        created_at: row.get(4)?,
        is_latest: row.get(5)?,
    })
}

const COLS: &str = "id, node_id, payload, generated_from_event, created_at, is_latest";

/// Summary repository — stateless, every method takes `&Connection`.
pub struct SummaryRepo;

impl SummaryRepo {
    /// Clear `is_latest` on the current latest summary, if any.
    pub fn demote_latest(conn: &Connection, node_id: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE node_summaries SET is_latest = 0 WHERE node_id = ?1 AND is_latest = 1",
            params![node_id],
        )?;
        Ok(changed > 0)
    }

    /// Insert a new latest summary. Callers must demote first.
    pub fn insert_latest(
        conn: &Connection,
        node_id: &str,
        payload: &str,
        generated_from_event: Option<&str>,
    ) -> Result<SummaryRow> {
        let id = fractal_core::ids::summary_id();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO node_summaries (id, node_id, payload, generated_from_event, created_at, is_latest)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![id, node_id, payload, generated_from_event, now],
        )?;
        Ok(SummaryRow {
            id,
            node_id: node_id.to_string(),
            payload: payload.to_string(),
            generated_from_event: generated_from_event.map(String::from),
            created_at: now,
            is_latest: true,
        })
    }

    /// The latest summary for a node, if any.
    pub fn latest(conn: &Connection, node_id: &str) -> Result<Option<SummaryRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLS} FROM node_summaries WHERE node_id = ?1 AND is_latest = 1"),
                params![node_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get a summary by ID.
    pub fn get_by_id(conn: &Connection, summary_id: &str) -> Result<Option<SummaryRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLS} FROM node_summaries WHERE id = ?1"),
                params![summary_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Full summary history for a node, oldest first.
    pub fn by_node(conn: &Connection, node_id: &str) -> Result<Vec<SummaryRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM node_summaries WHERE node_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map(params![node_id], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// How many summaries a node has with `is_latest = 1`. Invariant checks.
    pub fn latest_count(conn: &Connection, node_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM node_summaries WHERE node_id = ?1 AND is_latest = 1",
            params![node_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
