//! Graph edge repository — knowledge triples with provenance.
//!
//! Edges are soft-deleted: `deleted_at` is set and every read filters it out.
//! `owner_node` changes when a merge re-attributes an edge; `provenance_node`
//! never changes after insert.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::Result;
use crate::row_types::EdgeRow;

fn map_row(row: &Row<'_>) -> rusqlite::Result<EdgeRow> {
    Ok(EdgeRow {
        id: row.get(0)?,
        from_entity: row.get(1)?,
        to_entity: row.get(2)?,
        relation_type: row.get(3)?,
        owner_node: row.get(4)?,
        provenance_node: row.get(5)?,
        confidence: row.get(6)?,
        created_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

const COLS: &str = "id, from_entity, to_entity, relation_type, owner_node, provenance_node, confidence, created_at, deleted_at";

/// Edge insert options.
pub struct InsertEdgeOptions<'a> {
    /// Source entity.
    pub from_entity: &'a str,
    /// Target entity.
    pub to_entity: &'a str,
    /// Relation type, uppercased by convention.
    pub relation_type: &'a str,
    /// Current owning node.
    pub owner_node: &'a str,
    /// Originally contributing node.
    pub provenance_node: &'a str,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// Graph repository — stateless, every method takes `&Connection`.
pub struct GraphRepo;

impl GraphRepo {
    /// Insert one edge.
    pub fn insert(conn: &Connection, opts: &InsertEdgeOptions<'_>) -> Result<EdgeRow> {
        let id = fractal_core::ids::edge_id();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO graph_edges (id, from_entity, to_entity, relation_type, owner_node, provenance_node, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                opts.from_entity,
                opts.to_entity,
                opts.relation_type,
                opts.owner_node,
                opts.provenance_node,
                opts.confidence,
                now
            ],
        )?;
        Ok(EdgeRow {
            id,
            from_entity: opts.from_entity.to_string(),
            to_entity: opts.to_entity.to_string(),
            relation_type: opts.relation_type.to_string(),
            owner_node: opts.owner_node.to_string(),
            provenance_node: opts.provenance_node.to_string(),
            confidence: opts.confidence,
            created_at: now,
            deleted_at: None,
        })
    }

    /// Get an edge by ID (including soft-deleted ones — callers that care
    /// check `deleted_at`).
    pub fn get_by_id(conn: &Connection, edge_id: &str) -> Result<Option<EdgeRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLS} FROM graph_edges WHERE id = ?1"),
                params![edge_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Live edges owned by one node.
    pub fn by_owner(conn: &Connection, owner_node: &str) -> Result<Vec<EdgeRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM graph_edges
             WHERE owner_node = ?1 AND deleted_at IS NULL
             ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map(params![owner_node], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Live edges owned by any node in the given set, in a stable order.
    pub fn by_owners(conn: &Connection, owner_nodes: &[String]) -> Result<Vec<EdgeRow>> {
        let mut out = Vec::new();
        for owner in owner_nodes {
            out.extend(Self::by_owner(conn, owner)?);
        }
        Ok(out)
    }

    /// A live edge equivalent to the triple under one of the given owners,
    /// if any. Equivalence is (from, to, relation) — confidence is not part
    /// of identity.
    pub fn find_equivalent(
        conn: &Connection,
        from_entity: &str,
        to_entity: &str,
        relation_type: &str,
        owner_nodes: &[String],
    ) -> Result<Option<EdgeRow>> {
        for owner in owner_nodes {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {COLS} FROM graph_edges
                         WHERE from_entity = ?1 AND to_entity = ?2 AND relation_type = ?3
                           AND owner_node = ?4 AND deleted_at IS NULL"
                    ),
                    params![from_entity, to_entity, relation_type, owner],
                    map_row,
                )
                .optional()?;
            if row.is_some() {
                return Ok(row);
            }
        }
        Ok(None)
    }

    /// Set confidence on one edge.
    pub fn update_confidence(conn: &Connection, edge_id: &str, confidence: f64) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE graph_edges SET confidence = ?1 WHERE id = ?2",
            params![confidence, edge_id],
        )?;
        Ok(changed > 0)
    }

    /// Move an edge to a new owner. `provenance_node` is left untouched.
    pub fn reattribute(conn: &Connection, edge_id: &str, new_owner: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE graph_edges SET owner_node = ?1 WHERE id = ?2",
            params![new_owner, edge_id],
        )?;
        Ok(changed > 0)
    }

    /// Soft-delete every live edge owned by a node. Returns how many edges
    /// were marked.
    pub fn soft_delete_by_owner(conn: &Connection, owner_node: &str) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE graph_edges SET deleted_at = ?1
             WHERE owner_node = ?2 AND deleted_at IS NULL",
            params![now, owner_node],
        )?;
        Ok(changed)
    }

    /// Soft-delete one edge.
    pub fn soft_delete(conn: &Connection, edge_id: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE graph_edges SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, edge_id],
        )?;
        Ok(changed > 0)
    }

    /// Count live edges for an owner.
    pub fn count_by_owner(conn: &Connection, owner_node: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM graph_edges WHERE owner_node = ?1 AND deleted_at IS NULL",
            params![owner_node],
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
        for (id, parent) in [("node_r", None), ("node_a", Some("node_r")), ("node_b", Some("node_r"))] {
            NodeRepo::insert(
                &conn,
                &CreateNodeOptions {
                    id,
                    parent_id: parent,
                    title: id,
                    kind: if parent.is_none() { "root" } else { "standard" },
                    position: (0.0, 0.0),
                    created_by: None,
                },
            )
            .unwrap();
        }
        conn
    }

    fn edge(conn: &Connection, from: &str, to: &str, rel: &str, owner: &str) -> EdgeRow {
        GraphRepo::insert(
            conn,
            &InsertEdgeOptions {
                from_entity: from,
                to_entity: to,
                relation_type: rel,
                owner_node: owner,
                provenance_node: owner,
                confidence: 0.9,
            },
        )
        .unwrap()
    }

    #[test]
    fn insert_and_read_by_owner() {
        let conn = setup();
        let e = edge(&conn, "Rust", "Memory Safety", "PROVIDES", "node_a");
        assert!(e.id.starts_with("edge_"));

        let edges = GraphRepo::by_owner(&conn, "node_a").unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].provenance_node, "node_a");
    }

    #[test]
    fn find_equivalent_scans_owner_set() {
        let conn = setup();
        edge(&conn, "A", "B", "USES", "node_a");

        let owners = vec!["node_r".to_string(), "node_a".to_string()];
        let found = GraphRepo::find_equivalent(&conn, "A", "B", "USES", &owners)
            .unwrap()
            .unwrap();
        assert_eq!(found.owner_node, "node_a");

        assert!(GraphRepo::find_equivalent(&conn, "A", "B", "DEPENDS_ON", &owners)
            .unwrap()
            .is_none());
        let only_root = vec!["node_r".to_string()];
        assert!(GraphRepo::find_equivalent(&conn, "A", "B", "USES", &only_root)
            .unwrap()
            .is_none());
    }

    #[test]
    fn update_confidence() {
        let conn = setup();
        let e = edge(&conn, "A", "B", "USES", "node_a");
        assert!(GraphRepo::update_confidence(&conn, &e.id, 0.99).unwrap());
        let again = GraphRepo::get_by_id(&conn, &e.id).unwrap().unwrap();
        assert!((again.confidence - 0.99).abs() < f64::EPSILON);
    }

    #[test]
    fn reattribute_keeps_provenance() {
        let conn = setup();
        let e = edge(&conn, "A", "B", "USES", "node_a");
        assert!(GraphRepo::reattribute(&conn, &e.id, "node_r").unwrap());

        let moved = GraphRepo::get_by_id(&conn, &e.id).unwrap().unwrap();
        assert_eq!(moved.owner_node, "node_r");
        assert_eq!(moved.provenance_node, "node_a");
        assert!(GraphRepo::by_owner(&conn, "node_a").unwrap().is_empty());
        assert_eq!(GraphRepo::by_owner(&conn, "node_r").unwrap().len(), 1);
    }

    #[test]
    fn soft_delete_by_owner_scopes_to_one_node() {
        let conn = setup();
        edge(&conn, "A", "B", "USES", "node_a");
        edge(&conn, "C", "D", "USES", "node_a");
        edge(&conn, "E", "F", "USES", "node_b");

        assert_eq!(GraphRepo::soft_delete_by_owner(&conn, "node_a").unwrap(), 2);
        assert!(GraphRepo::by_owner(&conn, "node_a").unwrap().is_empty());
        assert_eq!(GraphRepo::by_owner(&conn, "node_b").unwrap().len(), 1);

        // Already-deleted edges are not re-marked.
        assert_eq!(GraphRepo::soft_delete_by_owner(&conn, "node_a").unwrap(), 0);
    }

    #[test]
    fn soft_deleted_edge_retains_row() {
        let conn = setup();
        let e = edge(&conn, "A", "B", "USES", "node_a");
        assert!(GraphRepo::soft_delete(&conn, &e.id).unwrap());

        let row = GraphRepo::get_by_id(&conn, &e.id).unwrap().unwrap();
        assert!(row.deleted_at.is_some());
        assert_eq!(GraphRepo::count_by_owner(&conn, "node_a").unwrap(), 0);
    }

    #[test]
    fn soft_deleted_edge_does_not_block_reinsert() {
        let conn = setup();
        let e = edge(&conn, "A", "B", "USES", "node_a");
        assert!(GraphRepo::soft_delete(&conn, &e.id).unwrap());

        let fresh = edge(&conn, "A", "B", "USES", "node_a");
        assert_ne!(fresh.id, e.id);
        assert_eq!(GraphRepo::count_by_owner(&conn, "node_a").unwrap(), 1);
        let owners = vec!["node_a".to_string()];
        let found = GraphRepo::find_equivalent(&conn, "A", "B", "USES", &owners)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, fresh.id);
    }

    #[test]
    fn duplicate_triple_same_owner_rejected() {
        let conn = setup();
        edge(&conn, "A", "B", "USES", "node_a");
        let dup = GraphRepo::insert(
            &conn,
            &InsertEdgeOptions {
                from_entity: "A",
                to_entity: "B",
                relation_type: "USES",
                owner_node: "node_a",
                provenance_node: "node_a",
                confidence: 0.5,
            },
        );
        assert!(dup.is_err());
    }

    #[test]
    fn by_owners_concatenates() {
        let conn = setup();
        edge(&conn, "A", "B", "USES", "node_a");
        edge(&conn, "C", "D", "USES", "node_b");
        let owners = vec!["node_a".to_string(), "node_b".to_string()];
        assert_eq!(GraphRepo::by_owners(&conn, &owners).unwrap().len(), 2);
    }
}
