//! POST /api/verify — photo inspection against a waypoint.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use questline_core::error::DomainError;
use questline_verification::{ConfidenceBand, OutcomeKind, VisionRequest, pick_follow_up};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::routes::correlate;
use crate::state::AppState;

/// Request body for POST /verify.
#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    /// Base64 photo, optionally as a `data:` URL.
    pub photo: String,
    /// Waypoint the photo claims to show.
    pub waypoint_id: u32,
    /// MIME type of the photo; a `data:` URL prefix takes precedence.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Base64 reference photos of the real spot.
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Response body for POST /verify.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Outcome of the check.
    pub kind: OutcomeKind,
    /// Whether the photo verifies the waypoint.
    pub is_correct: bool,
    /// Confidence 0..=100, absent if the service failed.
    pub confidence: Option<u8>,
    /// Band the confidence falls in.
    pub band: Option<ConfidenceBand>,
    /// Identifiers the service saw.
    pub matches: Vec<String>,
    /// Reply to show the participants.
    pub response: String,
    /// Clarifying question for a partial match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

/// Decodes a base64 payload, accepting a `data:<type>;base64,` prefix.
/// Returns the bytes and the media type from the prefix, if any.
pub(crate) fn decode_image(
    field: &str,
    raw: &str,
) -> Result<(Vec<u8>, Option<String>), DomainError> {
    let raw = raw.trim();
    let (media_type, payload) = match raw
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((media_type, payload)) => (Some(media_type.to_owned()), payload),
        None => (None, raw),
    };
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| DomainError::Validation(format!("{field} is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(DomainError::Validation(format!("{field} is empty")));
    }
    Ok((bytes, media_type))
}

/// POST /verify
#[instrument(
    skip(state, body),
    fields(correlation_id = tracing::field::Empty, waypoint_id = body.waypoint_id)
)]
async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResponse>, ApiError> {
    correlate();
    let waypoint = state
        .definition
        .catalog
        .get(body.waypoint_id)
        .ok_or_else(|| DomainError::Validation(format!("unknown waypoint {}", body.waypoint_id)))?;

    let (photo, prefixed_type) = decode_image("photo", &body.photo)?;
    let reference_images = body
        .reference_images
        .iter()
        .map(|image| decode_image("reference image", image).map(|(bytes, _)| bytes))
        .collect::<Result<Vec<_>, _>>()?;
    let media_type = prefixed_type
        .or(body.media_type)
        .unwrap_or_else(|| "image/jpeg".to_owned());

    let request = VisionRequest {
        photo,
        media_type,
        waypoint_id: waypoint.id,
        waypoint_name: waypoint.name.clone(),
        visual_identifiers: waypoint.visual_identifiers.clone(),
        reference_images,
    };
    let outcome = state.photo.verify(request, state.vision.as_ref()).await;

    let follow_up = if outcome.band == Some(ConfidenceBand::Partial) {
        let mut rng = state
            .rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        Some(pick_follow_up(&waypoint.follow_up_prompts, &mut *rng))
    } else {
        None
    };

    info!(kind = ?outcome.kind, confidence = ?outcome.confidence, "photo verified");

    Ok(Json(VerifyResponse {
        kind: outcome.kind,
        is_correct: outcome.is_accepted(),
        confidence: outcome.confidence,
        band: outcome.band,
        matches: outcome.matched_identifiers,
        response: outcome.response,
        follow_up,
    }))
}

/// Returns the verify router.
pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify))
}
