//! Photo strategy: the vision service scores a photo, thresholds decide.

use tracing::{info, warn};

use crate::domain::contracts::{VisionRequest, VisionService};
use crate::domain::outcome::{ConfidenceBand, VerificationMethod, VerificationOutcome};
use crate::domain::policy::PhotoThresholds;

/// Shown when the photo could not be checked at all.
pub const PHOTO_RETRY_MESSAGE: &str = "Verification failed. Try again or use GPS.";

/// Shown when a low-band photo came back without a reply.
const LOW_CONFIDENCE_MESSAGE: &str = "That doesn't look quite right. Try again!";

/// Shown when an empty capture is submitted.
const EMPTY_PHOTO_MESSAGE: &str = "No photo came through. Take another one and try again.";

/// Confidence-banded photo verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoStrategy {
    thresholds: PhotoThresholds,
}

impl PhotoStrategy {
    /// Creates a strategy with the given bands.
    #[must_use]
    pub fn new(thresholds: PhotoThresholds) -> Self {
        Self { thresholds }
    }

    /// The bands in use.
    #[must_use]
    pub fn thresholds(&self) -> PhotoThresholds {
        self.thresholds
    }

    /// Sends the photo for inspection and bands the returned confidence.
    ///
    /// An empty photo is rejected without calling the service. Service
    /// failures become a neutral, retryable `Error` outcome; a failure is
    /// never treated as acceptance.
    pub async fn verify(
        &self,
        request: VisionRequest,
        service: &dyn VisionService,
    ) -> VerificationOutcome {
        if request.photo.is_empty() {
            return VerificationOutcome::error(VerificationMethod::Photo, EMPTY_PHOTO_MESSAGE);
        }

        let waypoint_id = request.waypoint_id;
        let report = match service.inspect(request).await {
            Ok(report) => report,
            Err(error) => {
                warn!(waypoint_id, error = %error, "vision service failed");
                return VerificationOutcome::error(VerificationMethod::Photo, PHOTO_RETRY_MESSAGE);
            }
        };

        let confidence = report.confidence.min(100);
        let band = self.thresholds.band(confidence);
        info!(waypoint_id, confidence, ?band, "photo scored");

        let response = if band == ConfidenceBand::Low && report.reply.trim().is_empty() {
            LOW_CONFIDENCE_MESSAGE.to_owned()
        } else {
            report.reply
        };
        VerificationOutcome::from_photo(confidence, band, response, report.matched_identifiers)
    }
}
