//! # fractal-llm
//!
//! Agent role routing over local Ollama inference devices.
//!
//! Every agent in the system is a named role (reasoner, summarizer,
//! merge-arbiter, graph-builder, explorer) resolved through the settings
//! role table to a model on one of two devices. The [`AgentClient`] trait is
//! the seam: the runtime is written against it, [`AgentRouter`] is the HTTP
//! implementation, and tests plug in stubs.
//!
//! Calls are non-streaming — the engine consumes whole replies and parses
//! them (summaries, verdicts, extractions) before committing anything.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod router;
pub mod types;

pub use client::AgentClient;
pub use errors::{Result, RouterError};
pub use router::AgentRouter;
pub use types::{ChatMessage, ChatRequest, ChatResponse};
