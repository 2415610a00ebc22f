//! POST /api/chat — one conversational turn with the guide.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use questline_core::error::DomainError;
use questline_quest::domain::aggregates::DEFAULT_TEAM_NAME;
use questline_verification::{ChatRequest, TranscriptEntry, photo_request_phrase};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::routes::correlate;
use crate::state::AppState;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// The participants' message.
    pub message: String,
    /// Current waypoint; `total + 1` means home base.
    pub current_waypoint: u32,
    /// Proof symbols collected so far.
    #[serde(default)]
    pub collected_symbols: Vec<String>,
    /// Hint levels revealed at the current waypoint.
    #[serde(default)]
    pub hints_used: u32,
    /// Party name.
    #[serde(default)]
    pub team_name: Option<String>,
    /// Conversation so far at this waypoint.
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
}

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The guide's reply, marker removed.
    pub response: String,
    /// Identifiers the message matched.
    pub match_count: u32,
    /// Whether the description verifies the waypoint.
    pub should_unlock: bool,
    /// Whether the UI should offer the camera.
    pub should_trigger_photo: bool,
    /// Clarifying question for a partial description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

/// Assembles the service request for `body`, resolving the waypoint.
fn chat_request(state: &AppState, body: ChatBody) -> Result<(ChatRequest, Vec<String>), DomainError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(DomainError::Validation("message must not be empty".to_owned()));
    }
    let catalog = &state.definition.catalog;
    let n = body.current_waypoint;

    let (waypoint_name, visual_identifiers, revealed_hint, prompts) = if n == catalog.finale_index() {
        (catalog.finale.name.clone(), Vec::new(), None, Vec::new())
    } else {
        let waypoint = catalog
            .get(n)
            .ok_or_else(|| DomainError::Validation(format!("unknown waypoint {n}")))?;
        let revealed_hint = body
            .hints_used
            .checked_sub(1)
            .and_then(|level| usize::try_from(level).ok())
            .and_then(|level| waypoint.hints.get(level).or_else(|| waypoint.hints.last()))
            .cloned();
        (
            waypoint.name.clone(),
            waypoint.visual_identifiers.clone(),
            revealed_hint,
            waypoint.follow_up_prompts.clone(),
        )
    };

    let request = ChatRequest {
        message: message.to_owned(),
        waypoint_id: n,
        waypoint_name,
        visual_identifiers,
        revealed_hint,
        collected_symbols: body.collected_symbols,
        hints_used: body.hints_used,
        team_name: body
            .team_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEAM_NAME.to_owned()),
        transcript: body.transcript,
    };
    Ok((request, prompts))
}

/// POST /chat
#[instrument(
    skip(state, body),
    fields(correlation_id = tracing::field::Empty, waypoint_id = body.current_waypoint)
)]
async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    correlate();
    let (request, prompts) = chat_request(&state, body)?;
    let wants_photo = photo_request_phrase(&request.message);
    let finale = request.waypoint_id == state.definition.catalog.finale_index();

    let reply = state.chat.chat(request).await.map_err(|e| {
        warn!(error = %e, "chat service failed");
        DomainError::Infrastructure(format!("chat service failed: {e}"))
    })?;

    let verdict = {
        let mut rng = state
            .rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        state.description.evaluate(&reply, &prompts, &mut *rng)
    };
    // Home base is verified by GPS only.
    let should_unlock = verdict.auto_advance && !finale;

    info!(match_count = reply.match_count, should_unlock, "chat reply relayed");

    Ok(Json(ChatResponse {
        response: verdict.reply,
        match_count: reply.match_count,
        should_unlock,
        should_trigger_photo: verdict.photo_prompt || wants_photo,
        follow_up: verdict.follow_up.filter(|_| !finale),
    }))
}

/// Returns the chat router.
pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}
