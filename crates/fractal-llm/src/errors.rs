//! Router error types.

use fractal_core::types::AgentRole;
use thiserror::Error;

/// Errors raised while routing a request to an agent.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The role has no binding in settings. Callers decide whether a
    /// fallback role applies.
    #[error("no agent bound for role '{0}'")]
    RoleUnavailable(AgentRole),

    /// Transport-level failure (connection refused, timeout, ...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered with a non-success status.
    #[error("agent device returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        message: String,
    },

    /// The device answered 2xx but the body was not a chat response.
    #[error("malformed agent response: {0}")]
    Malformed(String),
}

/// Result alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
