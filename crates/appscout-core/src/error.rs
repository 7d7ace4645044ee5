//! Error kinds.
//!
//! Expected run-time conditions (timeouts, ambiguity, dead ends, rejected
//! actions, exhausted budgets) are values in normal return types and never
//! appear here. Only programmer-error-class invariant breaks are errors.

use appscout_store::GraphError;

#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    /// A structural invariant was violated — a bug, reported loudly.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] GraphError),

    #[error("persistence failure: {0}")]
    Persist(#[from] crate::persist::PersistError),
}
