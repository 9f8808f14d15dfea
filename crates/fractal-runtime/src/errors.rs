//! Engine error taxonomy.
//!
//! Five categories, each with a distinct recovery story:
//! - `NotFound` / `InvalidState` — precondition failures, surfaced as-is.
//! - `RoleUnavailable` — recovered via fallback for the explorer role only,
//!   fatal for every other role.
//! - `MalformedAgentOutput` — fatal for the requesting step; graph
//!   extraction demotes it to a degraded outcome instead.
//! - `Storage` — always fatal, never retried here.

use fractal_core::types::AgentRole;
use fractal_llm::RouterError;
use fractal_store::StoreError;
use thiserror::Error;

/// Errors raised by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced node or summary does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is illegal for the entity's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An agent role's endpoint is unbound or unreachable.
    #[error("agent role '{role}' unavailable: {reason}")]
    RoleUnavailable {
        /// The role that could not be served.
        role: AgentRole,
        /// Why (unbound, connection refused, device error, ...).
        reason: String,
    },

    /// An agent answered but the reply did not parse into the expected
    /// structured payload.
    #[error("malformed agent output: {0}")]
    MalformedAgentOutput(String),

    /// Storage-layer failure. Fatal to the enclosing operation.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// Fold a router error into the engine taxonomy for a given role.
    ///
    /// Everything transport-shaped (unbound role, connection failure, device
    /// error) is `RoleUnavailable`; only a 2xx reply that fails to parse is
    /// `MalformedAgentOutput`.
    pub fn from_router(role: AgentRole, err: RouterError) -> Self {
        match err {
            RouterError::Malformed(msg) => Self::MalformedAgentOutput(msg),
            other => Self::RoleUnavailable {
                role,
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_errors_fold_by_category() {
        let unavailable = EngineError::from_router(
            AgentRole::Explorer,
            RouterError::RoleUnavailable(AgentRole::Explorer),
        );
        assert!(matches!(
            unavailable,
            EngineError::RoleUnavailable {
                role: AgentRole::Explorer,
                ..
            }
        ));

        let malformed =
            EngineError::from_router(AgentRole::Summarizer, RouterError::Malformed("bad".into()));
        assert!(matches!(malformed, EngineError::MalformedAgentOutput(_)));

        let api = EngineError::from_router(
            AgentRole::Reasoner,
            RouterError::Api {
                status: 500,
                message: "down".into(),
            },
        );
        assert!(matches!(api, EngineError::RoleUnavailable { .. }));
    }
}
