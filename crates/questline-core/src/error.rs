//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity (waypoint, content unit) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A command was rejected at the boundary: bad input or a transition
    /// that is not allowed from the current state.
    #[error("validation error: {0}")]
    Validation(String),

    /// A command would break a session invariant (e.g. advancing past the
    /// current waypoint).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An asynchronous result arrived for an attempt that is no longer the
    /// session's pending attempt.
    #[error("stale outcome for waypoint {waypoint_id} (attempt {attempt_id})")]
    StaleOutcome {
        /// The waypoint the attempt was started for.
        waypoint_id: u32,
        /// The attempt identifier carried by the late result.
        attempt_id: Uuid,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
