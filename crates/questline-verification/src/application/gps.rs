//! GPS proximity strategy.

use std::time::Duration;

use questline_geo::{Coordinate, within_radius};
use tracing::{info, warn};

use crate::domain::contracts::GeolocationProvider;
use crate::domain::errors::GeolocationError;
use crate::domain::outcome::{VerificationMethod, VerificationOutcome};

/// Accepts a discovery when a fresh device fix lies within a radius of the
/// waypoint's target.
#[derive(Debug, Clone, Copy)]
pub struct GpsStrategy {
    fix_timeout: Duration,
}

impl GpsStrategy {
    /// Creates a strategy that waits at most `fix_timeout` for a position.
    #[must_use]
    pub fn new(fix_timeout: Duration) -> Self {
        Self { fix_timeout }
    }

    /// Obtains a fix and compares it against `target`.
    ///
    /// Device failures become an `Error` outcome carrying the specific,
    /// actionable message for that failure.
    pub async fn verify(
        &self,
        target: Coordinate,
        radius_meters: f64,
        provider: &dyn GeolocationProvider,
    ) -> VerificationOutcome {
        let fix = match tokio::time::timeout(self.fix_timeout, provider.current_position()).await {
            Ok(Ok(position)) => position,
            Ok(Err(error)) => return geolocation_failure(error),
            Err(_) => return geolocation_failure(GeolocationError::Timeout),
        };

        let check = within_radius(fix, target, radius_meters);
        info!(
            distance_meters = check.distance_meters,
            radius_meters,
            accepted = check.accepted,
            "GPS check evaluated"
        );
        VerificationOutcome::from_radius_check(check)
    }
}

fn geolocation_failure(error: GeolocationError) -> VerificationOutcome {
    warn!(error = %error, "could not obtain device position");
    VerificationOutcome::error(VerificationMethod::Gps, error.user_message())
}
