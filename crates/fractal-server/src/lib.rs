//! # fractal-server
//!
//! The HTTP surface of the Fractal engine: a small REST API over the
//! runtime's [`fractal_runtime::Engine`], plus the `fractal` binary that
//! wires settings, storage, agents, and the listener together.

#![deny(unsafe_code)]

pub mod api;
pub mod routes;
pub mod server;

pub use routes::{build_router, AppState};
pub use server::{start, ServerConfig, ServerHandle};
