//! Narration error types.

use std::time::Duration;

use questline_core::retry::AttemptTimedOut;
use thiserror::Error;

/// Failure of one narration stage. Never escapes the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationError {
    /// The provider has nothing for this unit.
    #[error("narration unavailable: {0}")]
    Unavailable(String),

    /// The speech service failed.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// A stage exceeded its time budget.
    #[error("narration stage timed out after {0:?}")]
    Timeout(Duration),

    /// The audio output refused or failed to play.
    #[error("playback failed: {0}")]
    Playback(String),
}

impl From<AttemptTimedOut> for NarrationError {
    fn from(timed_out: AttemptTimedOut) -> Self {
        Self::Timeout(timed_out.0)
    }
}
