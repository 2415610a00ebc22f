//! Time- and event-gated unlocking of hints and chat.
//!
//! Gates are re-derived from stored timestamps on every query, so they
//! survive reloads without any countdown state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Why a gate is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockReason {
    /// A facilitator opened it.
    Manual,
    /// The configured delay has passed.
    TimerExpired,
}

/// State of a gate at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateStatus {
    /// Closed; opens after `remaining_secs`.
    Locked {
        /// Seconds until the timer expires, rounded up.
        remaining_secs: u64,
    },
    /// Open.
    Unlocked {
        /// Why it is open.
        reason: UnlockReason,
    },
}

impl GateStatus {
    /// Returns `true` if the gate is open.
    #[must_use]
    pub fn is_unlocked(self) -> bool {
        matches!(self, Self::Unlocked { .. })
    }
}

/// Evaluates a gate that opens `delay` after `started_at`, or immediately
/// when `manual` is set. A zero delay is always open.
#[must_use]
pub fn evaluate_gate(
    started_at: Option<DateTime<Utc>>,
    delay: Duration,
    manual: bool,
    now: DateTime<Utc>,
) -> GateStatus {
    if manual {
        return GateStatus::Unlocked {
            reason: UnlockReason::Manual,
        };
    }
    if delay <= Duration::zero() {
        return GateStatus::Unlocked {
            reason: UnlockReason::TimerExpired,
        };
    }

    // A waypoint that was never shown has not started its timer.
    let elapsed = started_at.map_or_else(Duration::zero, |started| {
        (now - started).max(Duration::zero())
    });
    if elapsed >= delay {
        return GateStatus::Unlocked {
            reason: UnlockReason::TimerExpired,
        };
    }

    let remaining_ms = (delay - elapsed).num_milliseconds();
    let remaining_secs = u64::try_from(remaining_ms).unwrap_or(0).div_ceil(1000);
    GateStatus::Locked { remaining_secs }
}
