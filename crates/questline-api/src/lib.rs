//! Questline — HTTP API.
//!
//! Hosts the quest session under `/api/quest` and proxies the services the
//! browser cannot call directly: the conversational guide, photo
//! inspection and speech synthesis. The session lives on disk; the proxy
//! routes are stateless and every request carries the context it needs.

pub mod config;
pub mod error;
pub mod host;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_router())
        .with_state(state)
}
