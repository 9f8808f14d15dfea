//! Context assembly: entity-store state → role-specific prompts.

pub mod assembler;
pub mod format;
pub mod prompts;

pub use assembler::{ContextAssembler, Prompt};
