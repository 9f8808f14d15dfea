//! Store error types.

use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the ledger/entity store.
///
/// Storage failures are always fatal to the enclosing operation and never
/// retried here beyond SQLite BUSY backoff — retry policy for anything else
/// belongs to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced node does not exist.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Referenced summary does not exist.
    #[error("Summary not found for node: {0}")]
    SummaryNotFound(String),

    /// Operation is structurally invalid (bad reference, bad payload).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON (de)serialization of a stored payload failed.
    #[error("Payload serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal invariant violation (poisoned lock, impossible state).
    #[error("Internal store error: {0}")]
    Internal(String),
}
