//! The [`AgentClient`] trait — the seam between the runtime and inference.
//!
//! The runtime depends on this trait, not on HTTP: tests substitute a stub
//! and production wires in [`crate::router::AgentRouter`].

use async_trait::async_trait;

use fractal_core::types::AgentRole;

use crate::errors::Result;

/// A client that can run one completion for a given agent role.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Run a single system+user completion through the agent bound to
    /// `role`, returning the raw text reply.
    ///
    /// Returns [`crate::RouterError::RoleUnavailable`] when the role has no
    /// binding — callers decide whether a fallback role applies.
    async fn complete(&self, role: AgentRole, system_prompt: &str, user_content: &str)
        -> Result<String>;
}
