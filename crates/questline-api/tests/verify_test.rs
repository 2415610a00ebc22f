//! Integration tests for the photo verification endpoint.

mod common;

use axum::http::StatusCode;
use questline_test_support::ScriptedVisionService;
use questline_verification::{ServiceError, VisionReport};
use serde_json::json;

#[tokio::test]
async fn test_confident_photo_is_accepted() {
    // Arrange
    let fakes = common::Fakes::new().with_vision(ScriptedVisionService::new(vec![Ok(
        VisionReport {
            matched_identifiers: vec!["big yellow starfish statue".to_owned()],
            confidence: 92,
            accepted: true,
            reply: "That's the star!".to_owned(),
        },
    )]));
    let app = common::build_test_app(&fakes);

    // Act
    let (status, json) = common::post_json(
        app,
        "/api/verify",
        &json!({"photo": "data:image/png;base64,anBlZw==", "waypoint_id": 1}),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kind"], "accepted");
    assert_eq!(json["is_correct"], true);
    assert_eq!(json["confidence"], 92);
    assert_eq!(json["band"], "high");
    assert_eq!(json["matches"], json!(["big yellow starfish statue"]));
    assert_eq!(json["response"], "That's the star!");
    assert!(json.get("follow_up").is_none());
    assert_eq!(fakes.vision.calls(), 1);
}

#[tokio::test]
async fn test_partial_photo_asks_a_follow_up() {
    let fakes = common::Fakes::new()
        .with_vision(ScriptedVisionService::scoring(65, "Could be! Is there a bench?"));
    let app = common::build_test_app(&fakes);

    let (status, json) = common::post_json(
        app,
        "/api/verify",
        &json!({"photo": "anBlZw==", "waypoint_id": 1, "reference_images": ["cmVm"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kind"], "rejected_low_confidence");
    assert_eq!(json["is_correct"], false);
    assert_eq!(json["band"], "partial");
    assert_eq!(json["follow_up"], "What colour is the star you found?");
}

#[tokio::test]
async fn test_vision_failure_is_a_retryable_error_not_a_rejection() {
    let fakes = common::Fakes::new().with_vision(ScriptedVisionService::new(vec![Err(
        ServiceError::Transport("connection refused".to_owned()),
    )]));
    let app = common::build_test_app(&fakes);

    let (status, json) = common::post_json(
        app,
        "/api/verify",
        &json!({"photo": "anBlZw==", "waypoint_id": 1}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kind"], "error");
    assert_eq!(json["is_correct"], false);
    assert!(json["confidence"].is_null());
    assert_eq!(json["response"], "Verification failed. Try again or use GPS.");
}

#[tokio::test]
async fn test_bad_base64_returns_400_without_calling_the_service() {
    let fakes = common::Fakes::new();
    let app = common::build_test_app(&fakes);

    let (status, json) = common::post_json(
        app,
        "/api/verify",
        &json!({"photo": "not base64!", "waypoint_id": 1}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert_eq!(fakes.vision.calls(), 0);
}

#[tokio::test]
async fn test_home_base_cannot_be_verified_by_photo() {
    let fakes = common::Fakes::new();
    let app = common::build_test_app(&fakes);

    let (status, json) = common::post_json(
        app,
        "/api/verify",
        &json!({"photo": "anBlZw==", "waypoint_id": 9}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "unknown waypoint 9");
}
