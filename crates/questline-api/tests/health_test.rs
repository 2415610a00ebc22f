//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;
use questline_test_support::ScriptedSynthesizer;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app(&common::Fakes::new());

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["waypoints"], 8);
    assert_eq!(json["speech"], false);
}

#[tokio::test]
async fn test_health_summarizes_loaded_quest() {
    let app = common::build_test_app(&common::Fakes::new());

    let (_, json) = common::get_json(app, "/health").await;

    // The bell stop has no target.
    assert_eq!(json["gps_waypoints"], 7);
    assert_eq!(json["finale"], "HOME");
}

#[tokio::test]
async fn test_health_reports_configured_speech() {
    let fakes = common::Fakes::new().with_speech(ScriptedSynthesizer::default());
    let app = common::build_test_app(&fakes);

    let (_, json) = common::get_json(app, "/health").await;

    assert_eq!(json["speech"], true);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app(&common::Fakes::new());

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
