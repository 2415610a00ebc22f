//! Failures of the consumed services and of the device location API.

use std::time::Duration;

use questline_core::retry::AttemptTimedOut;
use thiserror::Error;

/// Failure of an external chat, vision or speech service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// No response within the time budget.
    #[error("service timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status.
    #[error("service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<AttemptTimedOut> for ServiceError {
    fn from(timed_out: AttemptTimedOut) -> Self {
        Self::Timeout(timed_out.0)
    }
}

/// Failure to obtain a device position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user refused location access.
    #[error("location permission denied")]
    PermissionDenied,
    /// The device could not determine a position.
    #[error("position unavailable")]
    PositionUnavailable,
    /// No fix arrived in time.
    #[error("location request timed out")]
    Timeout,
    /// The device has no location capability.
    #[error("geolocation not supported")]
    Unsupported,
}

impl GeolocationError {
    /// Actionable guidance for the participants.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location permission denied. Open your browser's site settings, allow location, then try again."
            }
            Self::PositionUnavailable => "Could not determine location. Make sure GPS is enabled.",
            Self::Timeout => "Location request timed out. Try again.",
            Self::Unsupported => "GPS not supported on this device. Try a photo instead.",
        }
    }
}
