//! Attempt limits and confidence thresholds.

use questline_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::outcome::ConfidenceBand;

/// How many GPS checks a waypoint allows.
///
/// Intermediate waypoints are capped so the participants fall back to the
/// photo or description path; the finale is never capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsAttemptPolicy {
    /// At most this many checks.
    Limited(u32),
    /// Always retryable.
    Unlimited,
}

impl GpsAttemptPolicy {
    /// Returns `true` if another check may be made after `attempts_made`.
    #[must_use]
    pub fn permits(self, attempts_made: u32) -> bool {
        match self {
            Self::Limited(cap) => attempts_made < cap,
            Self::Unlimited => true,
        }
    }

    /// Checks left after `attempts_made`, or `None` when unlimited.
    #[must_use]
    pub fn remaining(self, attempts_made: u32) -> Option<u32> {
        match self {
            Self::Limited(cap) => Some(cap.saturating_sub(attempts_made)),
            Self::Unlimited => None,
        }
    }
}

/// Confidence thresholds for the photo path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoThresholds {
    accept: u8,
    partial: u8,
}

impl Default for PhotoThresholds {
    fn default() -> Self {
        Self {
            accept: 80,
            partial: 50,
        }
    }
}

impl PhotoThresholds {
    /// Builds thresholds, requiring `partial <= accept <= 100`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the thresholds are not ordered.
    pub fn new(accept: u8, partial: u8) -> Result<Self, DomainError> {
        if accept > 100 || partial > accept {
            return Err(DomainError::Validation(format!(
                "photo thresholds must satisfy partial <= accept <= 100 (got partial {partial}, accept {accept})"
            )));
        }
        Ok(Self { accept, partial })
    }

    /// Confidence at or above which a photo is accepted.
    #[must_use]
    pub fn accept(self) -> u8 {
        self.accept
    }

    /// Confidence at or above which a photo is a partial match.
    #[must_use]
    pub fn partial(self) -> u8 {
        self.partial
    }

    /// Places a confidence score in its band.
    #[must_use]
    pub fn band(self, confidence: u8) -> ConfidenceBand {
        if confidence >= self.accept {
            ConfidenceBand::High
        } else if confidence >= self.partial {
            ConfidenceBand::Partial
        } else {
            ConfidenceBand::Low
        }
    }
}
