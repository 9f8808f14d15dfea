//! # fractal-runtime
//!
//! The orchestration layer of the Fractal engine: node lifecycle,
//! context assembly, agent invocation with explorer fallback, and the
//! merge flow.
//!
//! Layout:
//!
//! - [`context`] — entity-store state → role-specific prompts
//! - [`graph`] — agent-boundary shapes for graph extraction
//! - [`orchestrator`] — [`Engine`], the operation surface the server exposes
//! - [`errors`] — the [`EngineError`] taxonomy
//!
//! This crate never touches SQL or HTTP directly: storage goes through
//! `fractal_store::WorkspaceStore`, inference through the
//! `fractal_llm::AgentClient` trait.

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod graph;
pub mod orchestrator;

pub use context::{ContextAssembler, Prompt};
pub use errors::{EngineError, Result};
pub use graph::{GraphOutcome, GraphUpdate};
pub use orchestrator::{
    CopyOutcome, CreateNodeRequest, DeleteOutcome, Engine, GraphView, MergeOutcome,
    MessageOutcome, SummarizeOutcome, TreeNode,
};
