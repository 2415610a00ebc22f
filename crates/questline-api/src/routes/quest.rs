//! /api/quest — the hosted quest session.
//!
//! One route per participant control. Every command answers with the
//! session view afterwards, so the browser never keeps its own copy.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use questline_core::error::DomainError;
use questline_geo::Coordinate;
use questline_quest::application::command_handlers::{
    handle_attempt_override, handle_cancel_verification, handle_check_gps, handle_continue,
    handle_found_it, handle_present_waypoint, handle_reset, handle_reveal_hint,
    handle_send_message, handle_start_quest, handle_submit_photo,
};
use questline_quest::application::query_handlers::{QuestView, get_quest_view};
use questline_quest::domain::aggregates::Resolution;
use questline_quest::domain::commands::{
    AttemptOverride, CancelVerification, CheckGps, ContinueQuest, FoundIt, OverrideAction,
    PresentWaypoint, ResetQuest, RevealHint, SendMessage, StartQuest, SubmitPhoto,
};
use questline_verification::{GeolocationError, VerificationOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::host::HostedQuest;
use crate::routes::correlate;
use crate::routes::verify::decode_image;
use crate::state::AppState;

fn hosted(state: &AppState) -> Result<&HostedQuest, DomainError> {
    state
        .quest
        .as_ref()
        .ok_or_else(|| DomainError::NotFound("this server does not host a quest".to_owned()))
}

/// The session after a command.
#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view: QuestView,
}

/// Request body for POST /quest/start.
#[derive(Debug, Deserialize)]
pub struct StartBody {
    #[serde(default)]
    pub team_name: String,
}

/// Reply to a discovery claim.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub reply: String,
    pub view: QuestView,
}

/// What the device reported for a GPS check: a fix, or why there is none.
#[derive(Debug, Deserialize)]
pub struct GpsBody {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub error: Option<DeviceLocationError>,
}

/// Geolocation failures as the browser names them.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceLocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
}

impl From<DeviceLocationError> for GeolocationError {
    fn from(error: DeviceLocationError) -> Self {
        match error {
            DeviceLocationError::PermissionDenied => Self::PermissionDenied,
            DeviceLocationError::PositionUnavailable => Self::PositionUnavailable,
            DeviceLocationError::Timeout => Self::Timeout,
            DeviceLocationError::Unsupported => Self::Unsupported,
        }
    }
}

impl GpsBody {
    fn fix(&self) -> Result<Result<Coordinate, GeolocationError>, DomainError> {
        match (self.error, self.latitude, self.longitude) {
            (Some(error), _, _) => Ok(Err(error.into())),
            (None, Some(latitude), Some(longitude)) => Coordinate::new(latitude, longitude)
                .map(Ok)
                .map_err(|e| DomainError::Validation(e.to_string())),
            (None, _, _) => Ok(Err(GeolocationError::PositionUnavailable)),
        }
    }
}

/// Request body for POST /quest/photo.
#[derive(Debug, Deserialize)]
pub struct PhotoBody {
    /// Base64 photo, optionally as a `data:` URL.
    pub photo: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Result of a GPS or photo check.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub outcome: VerificationOutcome,
    /// Whether the check verified the stop (or home base).
    pub advanced: bool,
    pub view: QuestView,
}

/// Request body for POST /quest/message.
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// The guide's answer to a message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    pub should_trigger_photo: bool,
    pub advanced: bool,
    pub view: QuestView,
}

/// A hint shown.
#[derive(Debug, Serialize)]
pub struct HintResponse {
    pub level: u32,
    pub text: String,
    pub newly_revealed: bool,
    pub view: QuestView,
}

/// Request body for POST /quest/override.
#[derive(Debug, Deserialize)]
pub struct OverrideBody {
    pub passcode: String,
    pub action: OverrideAction,
}

/// Whether the passcode matched.
#[derive(Debug, Serialize)]
pub struct OverrideResponse {
    pub accepted: bool,
    pub view: QuestView,
}

/// GET /quest
async fn view(State(state): State<AppState>) -> Result<Json<QuestView>, ApiError> {
    let quest = hosted(&state)?;
    Ok(Json(get_quest_view(&quest.services).await))
}

/// POST /quest/start
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn start(
    State(state): State<AppState>,
    body: Option<Json<StartBody>>,
) -> Result<Json<ViewResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = StartQuest {
        correlation_id: correlate(),
        team_name: body.map(|Json(body)| body.team_name).unwrap_or_default(),
    };
    let transition = handle_start_quest(&command, &quest.services).await?;
    Ok(Json(ViewResponse {
        view: transition.view,
    }))
}

/// POST /quest/present
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn present(State(state): State<AppState>) -> Result<Json<ViewResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = PresentWaypoint {
        correlation_id: correlate(),
    };
    let transition = handle_present_waypoint(&command, &quest.services).await?;
    Ok(Json(ViewResponse {
        view: transition.view,
    }))
}

/// POST /quest/found-it
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn found_it(State(state): State<AppState>) -> Result<Json<ClaimResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = FoundIt {
        correlation_id: correlate(),
    };
    let claim = handle_found_it(&command, &quest.services).await?;
    Ok(Json(ClaimResponse {
        reply: claim.reply,
        view: claim.view,
    }))
}

/// POST /quest/gps
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn check_gps(
    State(state): State<AppState>,
    Json(body): Json<GpsBody>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let quest = hosted(&state)?;
    let fix = body.fix()?;
    let command = CheckGps {
        correlation_id: correlate(),
    };

    let _turn = quest.gps_turn.lock().await;
    quest.position.report(fix);
    let result = handle_check_gps(&command, &quest.services).await?;
    info!(
        kind = ?result.outcome.kind,
        distance = ?result.outcome.distance_meters,
        "gps check answered"
    );

    Ok(Json(VerificationResponse {
        advanced: result.resolution != Resolution::Retry,
        outcome: result.outcome,
        view: result.view,
    }))
}

/// POST /quest/photo
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn submit_photo(
    State(state): State<AppState>,
    Json(body): Json<PhotoBody>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let quest = hosted(&state)?;
    let (photo, prefixed_type) = decode_image("photo", &body.photo)?;
    let reference_images = body
        .reference_images
        .iter()
        .map(|image| decode_image("reference image", image).map(|(bytes, _)| bytes))
        .collect::<Result<Vec<_>, _>>()?;
    let command = SubmitPhoto {
        correlation_id: correlate(),
        photo,
        media_type: prefixed_type
            .or(body.media_type)
            .unwrap_or_else(|| "image/jpeg".to_owned()),
        reference_images,
    };

    let result = handle_submit_photo(&command, &quest.services).await?;
    Ok(Json(VerificationResponse {
        advanced: result.resolution != Resolution::Retry,
        outcome: result.outcome,
        view: result.view,
    }))
}

/// POST /quest/message
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<MessageBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = SendMessage {
        correlation_id: correlate(),
        message: body.message,
    };
    let result = handle_send_message(&command, &quest.services).await?;
    Ok(Json(MessageResponse {
        response: result.reply,
        follow_up: result.follow_up,
        should_trigger_photo: result.photo_prompt,
        advanced: result.advanced,
        view: result.view,
    }))
}

/// POST /quest/cancel
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn cancel(State(state): State<AppState>) -> Result<Json<ViewResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = CancelVerification {
        correlation_id: correlate(),
    };
    let transition = handle_cancel_verification(&command, &quest.services).await?;
    Ok(Json(ViewResponse {
        view: transition.view,
    }))
}

/// POST /quest/hint
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn reveal_hint(State(state): State<AppState>) -> Result<Json<HintResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = RevealHint {
        correlation_id: correlate(),
    };
    let result = handle_reveal_hint(&command, &quest.services).await?;
    Ok(Json(HintResponse {
        level: result.hint.level,
        text: result.hint.text,
        newly_revealed: result.hint.newly_revealed,
        view: result.view,
    }))
}

/// POST /quest/override
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty, action = ?body.action))]
async fn attempt_override(
    State(state): State<AppState>,
    Json(body): Json<OverrideBody>,
) -> Result<Json<OverrideResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = AttemptOverride {
        correlation_id: correlate(),
        passcode: body.passcode,
        action: body.action,
    };
    let result = handle_attempt_override(&command, &quest.services).await?;
    Ok(Json(OverrideResponse {
        accepted: result.accepted,
        view: result.view,
    }))
}

/// POST /quest/continue
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn continue_quest(State(state): State<AppState>) -> Result<Json<ViewResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = ContinueQuest {
        correlation_id: correlate(),
    };
    let transition = handle_continue(&command, &quest.services).await?;
    Ok(Json(ViewResponse {
        view: transition.view,
    }))
}

/// POST /quest/reset
#[instrument(skip_all, fields(correlation_id = tracing::field::Empty))]
async fn reset(State(state): State<AppState>) -> Result<Json<ViewResponse>, ApiError> {
    let quest = hosted(&state)?;
    let command = ResetQuest {
        correlation_id: correlate(),
    };
    let transition = handle_reset(&command, &quest.services).await?;
    Ok(Json(ViewResponse {
        view: transition.view,
    }))
}

/// GET /quest/narration — the cue to play, or 204 when silent.
async fn narration(State(state): State<AppState>) -> Result<Response, ApiError> {
    let quest = hosted(&state)?;
    Ok(match quest.relay.current() {
        Some(cue) => Json(cue).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Returns the hosted-quest router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view))
        .route("/start", post(start))
        .route("/present", post(present))
        .route("/found-it", post(found_it))
        .route("/gps", post(check_gps))
        .route("/photo", post(submit_photo))
        .route("/message", post(send_message))
        .route("/cancel", post(cancel))
        .route("/hint", post(reveal_hint))
        .route("/override", post(attempt_override))
        .route("/continue", post(continue_quest))
        .route("/reset", post(reset))
        .route("/narration", get(narration))
}
