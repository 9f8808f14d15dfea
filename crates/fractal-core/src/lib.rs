//! # fractal-core
//!
//! Foundation types for the Fractal branching-workspace engine.
//!
//! This crate provides the shared vocabulary that all other Fractal crates
//! depend on:
//!
//! - **Prefixed IDs**: [`ids::node_id`], [`ids::event_id`], etc. — UUID v7
//!   strings with a type prefix
//! - **Enums**: [`types::NodeKind`], [`types::NodeStatus`],
//!   [`types::MessageRole`], [`types::EventKind`], [`types::AgentRole`]
//! - **Structured payloads**: [`summary::SummaryPayload`],
//!   [`summary::GraphExtraction`], [`summary::MergeVerdict`]
//! - **Text utilities**: [`text::estimate_tokens`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other fractal crates.

#![deny(unsafe_code)]

pub mod ids;
pub mod summary;
pub mod text;
pub mod types;
