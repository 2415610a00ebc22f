//! GET /health — liveness plus a summary of the loaded quest.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// What the loaded quest looks like, so a deployment can be checked at a glance.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Intermediate waypoints, home base excluded.
    pub waypoints: u32,
    /// Waypoints that can be verified by GPS.
    pub gps_waypoints: usize,
    /// Proof symbol of home base.
    pub finale: String,
    /// Whether /tts will answer.
    pub speech: bool,
}

impl HealthResponse {
    fn of(state: &AppState) -> Self {
        let catalog = &state.definition.catalog;
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            waypoints: catalog.len(),
            gps_waypoints: catalog
                .waypoints
                .iter()
                .filter(|waypoint| waypoint.target.is_some())
                .count(),
            finale: catalog.finale.symbol.clone(),
            speech: state.speech.is_some(),
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::of(&state))
}

/// Returns the health router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
