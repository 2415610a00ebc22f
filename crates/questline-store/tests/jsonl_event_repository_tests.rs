//! Integration tests for `JsonLinesEventRepository`.

use chrono::Utc;
use questline_core::error::DomainError;
use questline_core::repository::{EventRepository, StoredEvent};
use questline_store::JsonLinesEventRepository;
use uuid::Uuid;

/// Helper to build a `StoredEvent` with sensible defaults.
fn make_stored_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: "quest.hint_revealed".to_string(),
        payload: serde_json::json!({"HintRevealed": {"waypoint_id": 1, "level": 1}}),
        sequence_number,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: Utc::now(),
    }
}

fn repository(dir: &tempfile::TempDir) -> JsonLinesEventRepository {
    JsonLinesEventRepository::new(dir.path().join("audit").join("events.jsonl"))
}

// --- load_events ---

#[tokio::test]
async fn test_load_events_returns_empty_vec_when_file_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);

    let events = repo.load_events(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

// --- append_events + load_events ---

#[tokio::test]
async fn test_append_and_load_single_event() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);
    let aggregate_id = Uuid::new_v4();
    let event = make_stored_event(aggregate_id, 1);

    // Act
    repo.append_events(aggregate_id, 0, &[event.clone()])
        .await
        .unwrap();
    let loaded = repo.load_events(aggregate_id).await.unwrap();

    // Assert
    assert_eq!(loaded, vec![event]);
}

#[tokio::test]
async fn test_appends_accumulate_in_sequence_order() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);
    let aggregate_id = Uuid::new_v4();

    repo.append_events(
        aggregate_id,
        0,
        &[
            make_stored_event(aggregate_id, 1),
            make_stored_event(aggregate_id, 2),
        ],
    )
    .await
    .unwrap();
    repo.append_events(aggregate_id, 2, &[make_stored_event(aggregate_id, 3)])
        .await
        .unwrap();

    let loaded = repo.load_events(aggregate_id).await.unwrap();
    let sequence: Vec<i64> = loaded.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequence, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_streams_are_isolated_by_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    repo.append_events(first, 0, &[make_stored_event(first, 1)])
        .await
        .unwrap();
    repo.append_events(second, 0, &[make_stored_event(second, 1)])
        .await
        .unwrap();

    assert_eq!(repo.load_events(first).await.unwrap().len(), 1);
    assert_eq!(repo.load_events(second).await.unwrap().len(), 1);
}

// --- optimistic concurrency ---

#[tokio::test]
async fn test_append_with_stale_expected_version_is_rejected() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);
    let aggregate_id = Uuid::new_v4();
    repo.append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
        .await
        .unwrap();

    // Act
    let result = repo
        .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
        .await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(msg)) if msg.contains("concurrency conflict")));
    assert_eq!(repo.load_events(aggregate_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_append_with_gap_in_sequence_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);
    let aggregate_id = Uuid::new_v4();

    let result = repo
        .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 2)])
        .await;

    assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    assert!(repo.load_events(aggregate_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_line_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    std::fs::write(&path, "not json\n").unwrap();
    let repo = JsonLinesEventRepository::new(path.clone());

    let result = repo.load_events(Uuid::new_v4()).await;

    assert!(matches!(result, Err(DomainError::Infrastructure(msg)) if msg.contains("line 1")));
}
