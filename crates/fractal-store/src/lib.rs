//! # fractal-store
//!
//! The append-only event ledger and current-state entity store, backed by
//! SQLite.
//!
//! Layout:
//!
//! - [`connection`] — r2d2 connection pool (WAL, foreign keys on)
//! - [`migrations`] — idempotent schema setup
//! - [`row_types`] — flat row structs returned by queries
//! - [`repo`] — stateless repositories, every method takes `&Connection`
//! - [`store`] — [`store::WorkspaceStore`], the transactional API with
//!   per-node write locks
//!
//! The ledger is the source of truth: every entity mutation happens in the
//! same SQLite transaction as exactly one ledger event. This crate has no
//! knowledge of prompts, agents, or merge policy — it is a fact log plus
//! CRUD on the four entity tables.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod row_types;
pub mod store;

pub use connection::{new_in_memory, new_pool, ConnectionConfig, ConnectionPool};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use store::WorkspaceStore;
