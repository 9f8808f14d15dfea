//! SQLite connection pooling.
//!
//! WAL journal mode for concurrent readers, foreign keys enforced, and a
//! busy timeout so writers queue at the database level before the in-process
//! retry loop kicks in.

use std::path::Path;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of SQLite connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// A single pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool configuration.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pooled connections.
    pub max_size: u32,
    /// SQLite busy timeout per connection.
    pub busy_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

fn init_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )
}

/// Open a pool on a database file.
pub fn new_pool(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let busy_timeout = config.busy_timeout;
    let manager = SqliteConnectionManager::file(path)
        .with_init(move |conn| init_connection(conn, busy_timeout));
    Ok(r2d2::Pool::builder()
        .max_size(config.max_size)
        .build(manager)?)
}

/// Open a pool on a shared in-memory database (tests).
///
/// Uses a unique shared-cache URI per call so every pooled connection sees
/// the same data while separate pools stay isolated.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    let uri = format!(
        "file:memdb_{}?mode=memory&cache=shared",
        uuid::Uuid::now_v7().simple()
    );
    let busy_timeout = config.busy_timeout;
    let manager = SqliteConnectionManager::file(uri)
        .with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .with_init(move |conn| init_connection(conn, busy_timeout));
    Ok(r2d2::Pool::builder()
        .max_size(config.max_size)
        .build(manager)?)
}
