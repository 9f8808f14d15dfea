//! Node repository — CRUD and tree traversal for the `nodes` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::Result;
use crate::row_types::NodeRow;

/// Options for inserting a node.
pub struct CreateNodeOptions<'a> {
    /// Pre-generated node ID.
    pub id: &'a str,
    /// Parent node ID; `None` for the root.
    pub parent_id: Option<&'a str>,
    /// Display title.
    pub title: &'a str,
    /// `root` | `standard` | `exploration`.
    pub kind: &'a str,
    /// Canvas position.
    pub position: (f64, f64),
    /// Optional creating actor.
    pub created_by: Option<&'a str>,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<NodeRow> {
    Ok(NodeRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        title: row.get(2)?,
        kind: row.get(3)?,
        status: row.get(4)?,
        position_x: row.get(5)?,
        position_y: row.get(6)?,
        created_at: row.get(7)?,
        created_by: row.get(8)?,
    })
}

const COLS: &str = "id, parent_id, title, kind, status, position_x, position_y, created_at, created_by";

/// Node repository — stateless, every method takes `&Connection`.
pub struct NodeRepo;

impl NodeRepo {
    /// Insert a new node row (status `active`).
    pub fn insert(conn: &Connection, opts: &CreateNodeOptions<'_>) -> Result<NodeRow> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO nodes (id, parent_id, title, kind, status, position_x, position_y, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?6, ?7, ?8)",
            params![
                opts.id,
                opts.parent_id,
                opts.title,
                opts.kind,
                opts.position.0,
                opts.position.1,
                now,
                opts.created_by
            ],
        )?;
        Ok(NodeRow {
            id: opts.id.to_string(),
            parent_id: opts.parent_id.map(String::from),
            title: opts.title.to_string(),
            kind: opts.kind.to_string(),
            status: "active".to_string(),
            position_x: opts.position.0,
            position_y: opts.position.1,
            created_at: now,
            created_by: opts.created_by.map(String::from),
        })
    }

    /// Get a node by ID.
    pub fn get_by_id(conn: &Connection, node_id: &str) -> Result<Option<NodeRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLS} FROM nodes WHERE id = ?1"),
                params![node_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// The parentless node, if one exists.
    pub fn root(conn: &Connection) -> Result<Option<NodeRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLS} FROM nodes WHERE parent_id IS NULL"),
                [],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Update node status. Returns `true` if a row changed.
    pub fn update_status(conn: &Connection, node_id: &str, status: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE nodes SET status = ?1 WHERE id = ?2",
            params![status, node_id],
        )?;
        Ok(changed > 0)
    }

    /// Walk `[node, parent, grandparent, …, root]`.
    ///
    /// Stops silently if a parent reference dangles (never happens under FK
    /// enforcement, but a broken chain should not loop forever).
    pub fn lineage(conn: &Connection, node_id: &str) -> Result<Vec<NodeRow>> {
        let mut chain = Vec::new();
        let mut current = Self::get_by_id(conn, node_id)?;
        while let Some(node) = current {
            let parent_id = node.parent_id.clone();
            chain.push(node);
            current = match parent_id {
                Some(pid) => Self::get_by_id(conn, &pid)?,
                None => None,
            };
        }
        Ok(chain)
    }

    /// Direct children of a node, in creation order.
    pub fn children(conn: &Connection, node_id: &str) -> Result<Vec<NodeRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM nodes WHERE parent_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map(params![node_id], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of direct children (used for deterministic placement).
    pub fn child_count(conn: &Connection, node_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE parent_id = ?1",
            params![node_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All descendants of a node, depth-first.
    pub fn descendants(conn: &Connection, node_id: &str) -> Result<Vec<NodeRow>> {
        let mut out = Vec::new();
        let mut stack = vec![node_id.to_string()];
        while let Some(current) = stack.pop() {
            for child in Self::children(conn, &current)? {
                stack.push(child.id.clone());
                out.push(child);
            }
        }
        Ok(out)
    }

    /// All non-deleted nodes (the tree read).
    pub fn tree(conn: &Connection) -> Result<Vec<NodeRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM nodes WHERE status != 'deleted' ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
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

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn insert(conn: &Connection, id: &str, parent: Option<&str>, kind: &str) -> NodeRow {
        NodeRepo::insert(
            conn,
            &CreateNodeOptions {
                id,
                parent_id: parent,
                title: id,
                kind,
                position: (0.0, 0.0),
                created_by: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn insert_and_get() {
        let conn = setup();
        let node = insert(&conn, "node_r", None, "root");
        let found = NodeRepo::get_by_id(&conn, "node_r").unwrap().unwrap();
        assert_eq!(found, node);
        assert_eq!(found.status, "active");
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = setup();
        assert!(NodeRepo::get_by_id(&conn, "node_missing").unwrap().is_none());
    }

    #[test]
    fn insert_with_dangling_parent_fails() {
        let conn = setup();
        let result = NodeRepo::insert(
            &conn,
            &CreateNodeOptions {
                id: "node_x",
                parent_id: Some("node_missing"),
                title: "x",
                kind: "standard",
                position: (0.0, 0.0),
                created_by: None,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn root_lookup() {
        let conn = setup();
        assert!(NodeRepo::root(&conn).unwrap().is_none());
        insert(&conn, "node_r", None, "root");
        assert_eq!(NodeRepo::root(&conn).unwrap().unwrap().id, "node_r");
    }

    #[test]
    fn update_status() {
        let conn = setup();
        insert(&conn, "node_r", None, "root");
        assert!(NodeRepo::update_status(&conn, "node_r", "frozen").unwrap());
        assert_eq!(
            NodeRepo::get_by_id(&conn, "node_r").unwrap().unwrap().status,
            "frozen"
        );
        assert!(!NodeRepo::update_status(&conn, "node_missing", "frozen").unwrap());
    }

    #[test]
    fn lineage_walks_to_root() {
        let conn = setup();
        insert(&conn, "node_r", None, "root");
        insert(&conn, "node_a", Some("node_r"), "standard");
        insert(&conn, "node_b", Some("node_a"), "standard");

        let lineage = NodeRepo::lineage(&conn, "node_b").unwrap();
        let ids: Vec<&str> = lineage.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["node_b", "node_a", "node_r"]);
    }

    #[test]
    fn lineage_of_root_is_itself() {
        let conn = setup();
        insert(&conn, "node_r", None, "root");
        let lineage = NodeRepo::lineage(&conn, "node_r").unwrap();
        assert_eq!(lineage.len(), 1);
    }

    #[test]
    fn children_and_counts() {
        let conn = setup();
        insert(&conn, "node_r", None, "root");
        insert(&conn, "node_a", Some("node_r"), "standard");
        insert(&conn, "node_b", Some("node_r"), "standard");

        assert_eq!(NodeRepo::child_count(&conn, "node_r").unwrap(), 2);
        let children = NodeRepo::children(&conn, "node_r").unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(NodeRepo::child_count(&conn, "node_a").unwrap(), 0);
    }

    #[test]
    fn descendants_cover_subtree() {
        let conn = setup();
        insert(&conn, "node_r", None, "root");
        insert(&conn, "node_a", Some("node_r"), "standard");
        insert(&conn, "node_b", Some("node_a"), "standard");
        insert(&conn, "node_c", Some("node_r"), "standard");

        let mut ids: Vec<String> = NodeRepo::descendants(&conn, "node_r")
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["node_a", "node_b", "node_c"]);
    }

    #[test]
    fn tree_excludes_deleted() {
        let conn = setup();
        insert(&conn, "node_r", None, "root");
        insert(&conn, "node_a", Some("node_r"), "standard");
        NodeRepo::update_status(&conn, "node_a", "deleted").unwrap();

        let tree = NodeRepo::tree(&conn).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "node_r");
    }
}
