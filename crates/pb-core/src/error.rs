//! Error taxonomy for schema edits and prompt resolution.
//!
//! Every failure is returned as a value. A failed edit never changes the
//! page: operations validate first and mutate second.

use crate::id::NodeId;

/// Failure of an edit against the page schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// A referenced node id does not exist in the page.
    #[error("node not found: {0}")]
    NotFound(NodeId),

    /// The intent is malformed or contradicts itself (bad index, empty key, ...).
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    /// Prompt resolution failed before any intent was produced.
    #[error("prompt resolution failed: {0}")]
    Resolver(#[from] ResolverError),

    /// The operation would break a tree invariant (duplicate id, ...).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl EditError {
    /// Short machine-readable code for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::InvalidIntent(_) => "E_INVALID_INTENT",
            Self::Resolver(_) => "E_RESOLVER",
            Self::ConstraintViolation(_) => "E_CONSTRAINT",
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Resolver(e) if e.retryable())
    }
}

/// Failure reported by a prompt resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// The resolver backend could not be reached.
    #[error("resolver unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the request for quota or rate reasons.
    #[error("resolver quota exceeded: {0}")]
    Quota(String),

    /// The backend answered with output that is not a list of intents.
    #[error("malformed resolver output: {0}")]
    Malformed(String),

    /// No answer within the configured timeout.
    #[error("resolver timed out after {0} ms")]
    TimedOut(u64),

    /// The resolver task died without answering.
    #[error("resolver crashed: {0}")]
    Crashed(String),

    /// The generation was superseded or shut down before it finished.
    #[error("generation cancelled")]
    Cancelled,
}

impl ResolverError {
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Quota(_) | Self::TimedOut(_))
    }
}
