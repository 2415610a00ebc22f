//! POST /api/tts — speech synthesis for dynamic replies.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};
use questline_core::error::DomainError;
use questline_narration::SynthesisRequest;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::routes::correlate;
use crate::state::AppState;

/// Longest text accepted for one synthesis call.
pub const MAX_TTS_CHARS: usize = 2_000;

/// Request body for POST /tts.
#[derive(Debug, Deserialize)]
pub struct TtsBody {
    /// Text to speak.
    pub text: String,
}

/// POST /tts
#[instrument(
    skip(state, body),
    fields(correlation_id = tracing::field::Empty, chars = body.text.chars().count())
)]
async fn tts(
    State(state): State<AppState>,
    Json(body): Json<TtsBody>,
) -> Result<impl IntoResponse, ApiError> {
    correlate();
    let text = body.text.trim();
    if text.is_empty() {
        return Err(DomainError::Validation("text must not be empty".to_owned()).into());
    }
    if text.chars().count() > MAX_TTS_CHARS {
        return Err(DomainError::Validation(format!(
            "text exceeds {MAX_TTS_CHARS} characters"
        ))
        .into());
    }
    let speech = state
        .speech
        .as_ref()
        .ok_or_else(|| DomainError::NotFound("speech synthesis is not configured".to_owned()))?;

    let request = SynthesisRequest {
        text: text.to_owned(),
        voice: speech.voice.clone(),
    };
    let clip = speech.synthesizer.synthesize(&request).await.map_err(|e| {
        warn!(error = %e, "speech synthesis failed");
        DomainError::Infrastructure(e.to_string())
    })?;

    Ok((
        [(header::CONTENT_TYPE, clip.media_type.clone())],
        clip.bytes.to_vec(),
    ))
}

/// Returns the speech router.
pub fn router() -> Router<AppState> {
    Router::new().route("/tts", post(tts))
}
