//! The normalised result of one verification attempt.

use questline_geo::RadiusCheck;
use serde::{Deserialize, Serialize};

/// What happened to the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The discovery is confirmed.
    Accepted,
    /// The device position is outside the acceptance radius.
    RejectedFar,
    /// The AI-assisted check did not reach the acceptance threshold.
    RejectedLowConfidence,
    /// The attempt could not be evaluated (service or device failure).
    Error,
}

/// Which strategy produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// Device position against the waypoint's target coordinate.
    Gps,
    /// Free-text description matched against visual identifiers.
    Description,
    /// Photo inspected by the vision service.
    Photo,
    /// Facilitator passcode; no strategy ran.
    Override,
}

/// Confidence band of a photo check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// At or above the accept threshold.
    High,
    /// Between the partial and accept thresholds.
    Partial,
    /// Below the partial threshold.
    Low,
}

/// Result of one verification attempt. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Accepted, rejected, or failed.
    pub kind: OutcomeKind,
    /// Strategy that produced this outcome.
    pub method: VerificationMethod,
    /// Confidence 0..=100 (photo path only).
    pub confidence: Option<u8>,
    /// Distance to target in metres (GPS path only).
    pub distance_meters: Option<u32>,
    /// Confidence band (photo path only).
    pub band: Option<ConfidenceBand>,
    /// Message to surface to the participants.
    pub response: String,
    /// Clarifying question for partial matches.
    pub follow_up: Option<String>,
    /// Identifiers the vision service reported seeing.
    pub matched_identifiers: Vec<String>,
}

impl VerificationOutcome {
    fn base(kind: OutcomeKind, method: VerificationMethod, response: String) -> Self {
        Self {
            kind,
            method,
            confidence: None,
            distance_meters: None,
            band: None,
            response,
            follow_up: None,
            matched_identifiers: Vec::new(),
        }
    }

    /// Outcome of a proximity check.
    #[must_use]
    pub fn from_radius_check(check: RadiusCheck) -> Self {
        let (kind, response) = if check.accepted {
            (
                OutcomeKind::Accepted,
                format!("Location confirmed! You're {}m from the spot.", check.distance_meters),
            )
        } else {
            (
                OutcomeKind::RejectedFar,
                format!("Not quite! {}m away", check.distance_meters),
            )
        };
        Self {
            distance_meters: Some(check.distance_meters),
            ..Self::base(kind, VerificationMethod::Gps, response)
        }
    }

    /// Outcome of a photo inspection already placed in a band.
    #[must_use]
    pub fn from_photo(
        confidence: u8,
        band: ConfidenceBand,
        response: String,
        matched_identifiers: Vec<String>,
    ) -> Self {
        let kind = if band == ConfidenceBand::High {
            OutcomeKind::Accepted
        } else {
            OutcomeKind::RejectedLowConfidence
        };
        Self {
            confidence: Some(confidence),
            band: Some(band),
            matched_identifiers,
            ..Self::base(kind, VerificationMethod::Photo, response)
        }
    }

    /// Outcome of a conversational description.
    #[must_use]
    pub fn from_description(accepted: bool, response: String) -> Self {
        let kind = if accepted {
            OutcomeKind::Accepted
        } else {
            OutcomeKind::RejectedLowConfidence
        };
        Self::base(kind, VerificationMethod::Description, response)
    }

    /// Acceptance granted by the facilitator passcode.
    #[must_use]
    pub fn overridden() -> Self {
        Self::base(
            OutcomeKind::Accepted,
            VerificationMethod::Override,
            "Override accepted. On to the celebration!".to_owned(),
        )
    }

    /// A neutral, retryable failure.
    #[must_use]
    pub fn error(method: VerificationMethod, response: impl Into<String>) -> Self {
        Self::base(OutcomeKind::Error, method, response.into())
    }

    /// Attaches a clarifying follow-up question.
    #[must_use]
    pub fn with_follow_up(mut self, follow_up: Option<String>) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// Returns `true` if the attempt confirmed the discovery.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.kind == OutcomeKind::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_check_inside_is_accepted_with_distance() {
        let outcome = VerificationOutcome::from_radius_check(RadiusCheck {
            accepted: true,
            distance_meters: 7,
        });

        assert!(outcome.is_accepted());
        assert_eq!(outcome.method, VerificationMethod::Gps);
        assert_eq!(outcome.distance_meters, Some(7));
        assert_eq!(outcome.confidence, None);
    }

    #[test]
    fn test_radius_check_outside_reports_distance_in_message() {
        let outcome = VerificationOutcome::from_radius_check(RadiusCheck {
            accepted: false,
            distance_meters: 200,
        });

        assert_eq!(outcome.kind, OutcomeKind::RejectedFar);
        assert_eq!(outcome.response, "Not quite! 200m away");
    }

    #[test]
    fn test_partial_photo_is_rejected_low_confidence() {
        let outcome =
            VerificationOutcome::from_photo(65, ConfidenceBand::Partial, "Close!".to_owned(), vec![]);

        assert_eq!(outcome.kind, OutcomeKind::RejectedLowConfidence);
        assert_eq!(outcome.band, Some(ConfidenceBand::Partial));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&OutcomeKind::RejectedLowConfidence).unwrap();

        assert_eq!(json, "\"rejected_low_confidence\"");
    }
}
