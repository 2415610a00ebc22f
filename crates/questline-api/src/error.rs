//! Startup failures and the JSON error contract of the routes.
//!
//! Every failed request answers `{"error": <code>, "message": <detail>}`.
//! Client mistakes echo their detail; server-side failures are logged in
//! full and answered with a generic message so upstream bodies and file
//! paths never reach the browser.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use questline_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Message sent in place of infrastructure detail.
pub const SERVER_FAILURE_MESSAGE: &str = "The guide is having trouble right now. Please try again.";

/// Reasons the server cannot start.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed environment.
    #[error("configuration error: {0}")]
    Config(String),

    /// The quest file parsed but failed validation.
    #[error("quest error: {0}")]
    Quest(#[from] DomainError),

    /// The chat, vision or speech client could not be built.
    #[error("service client error: {0}")]
    Client(String),

    /// Binding the listener or serving failed.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Wire shape of a failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// A route failure; converts from `DomainError` so handlers can use `?`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status and machine-readable code for this failure.
    #[must_use]
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::StaleOutcome { .. } => (StatusCode::CONFLICT, "stale_outcome"),
            DomainError::InvariantViolation(_) => (StatusCode::CONFLICT, "invariant_violation"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        }
    }

    /// The detail shown to the participant, without the variant prefix.
    fn public_message(&self) -> String {
        match &self.0 {
            DomainError::Validation(detail)
            | DomainError::NotFound(detail)
            | DomainError::InvariantViolation(detail) => detail.clone(),
            stale @ DomainError::StaleOutcome { .. } => stale.to_string(),
            DomainError::Infrastructure(_) => SERVER_FAILURE_MESSAGE.to_owned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            error!(error = %self.0, code, "request failed");
        }
        let body = ErrorBody {
            error: code,
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;

    async fn render(err: DomainError) -> (StatusCode, Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_echoes_detail_without_prefix() {
        let (status, body) = render(DomainError::Validation("message must not be empty".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "message must not be empty");
    }

    #[tokio::test]
    async fn test_missing_voice_is_404() {
        let (status, body) = render(DomainError::NotFound("speech is not configured".into())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "speech is not configured");
    }

    #[tokio::test]
    async fn test_late_verification_result_is_409() {
        let (status, body) = render(DomainError::StaleOutcome {
            waypoint_id: 3,
            attempt_id: Uuid::nil(),
        })
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "stale_outcome");
        assert!(body["message"].as_str().unwrap().contains("waypoint 3"));
    }

    #[test]
    fn test_skip_past_home_base_is_409() {
        let err = ApiError(DomainError::InvariantViolation("already at home base".into()));

        assert_eq!(err.classify(), (StatusCode::CONFLICT, "invariant_violation"));
    }

    #[tokio::test]
    async fn test_upstream_failure_hides_detail() {
        let (status, body) = render(DomainError::Infrastructure(
            "chat service failed: status 503: overloaded".into(),
        ))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "infrastructure_error");
        assert_eq!(body["message"], SERVER_FAILURE_MESSAGE);
    }
}
