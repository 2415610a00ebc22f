//! Integration tests for `FileSnapshotStore` and `DirectoryAssetSource`.

use questline_core::error::DomainError;
use questline_core::snapshot::SnapshotStore;
use questline_narration::AssetSource;
use questline_store::{DirectoryAssetSource, FileSnapshotStore};
use serde_json::json;

#[tokio::test]
async fn test_missing_document_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());

    assert!(store.load("quest-session").await.unwrap().is_none());
}

#[tokio::test]
async fn test_saved_document_is_read_back_verbatim() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path().join("state"));
    let document = json!({"phase": {"state": "AtWaypoint", "waypoint": 2}, "symbols": ["STAR"]});

    // Act
    store.save("quest-session", &document).await.unwrap();
    let loaded = store.load("quest-session").await.unwrap();

    // Assert
    assert_eq!(loaded, Some(document));
    assert!(dir.path().join("state").join("quest-session.json").exists());
    assert!(!dir.path().join("state").join("quest-session.json.tmp").exists());
}

#[tokio::test]
async fn test_save_replaces_previous_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());

    store.save("quest-session", &json!({"v": 1})).await.unwrap();
    store.save("quest-session", &json!({"v": 2})).await.unwrap();

    assert_eq!(
        store.load("quest-session").await.unwrap(),
        Some(json!({"v": 2}))
    );
}

#[tokio::test]
async fn test_corrupt_document_is_an_infrastructure_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("quest-session.json"), "{ truncated").unwrap();
    let store = FileSnapshotStore::new(dir.path());

    let result = store.load("quest-session").await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    store.save("quest-session", &json!({})).await.unwrap();

    store.remove("quest-session").await.unwrap();
    store.remove("quest-session").await.unwrap();

    assert!(store.load("quest-session").await.unwrap().is_none());
}

#[tokio::test]
async fn test_path_traversal_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());

    let result = store.save("../escape", &json!({})).await;

    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_asset_source_serves_rendered_clips() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clue-1.mp3"), b"ID3clip").unwrap();
    let source = DirectoryAssetSource::new(dir.path());

    // Act
    let clip = source.fetch("clue-1.mp3").await.unwrap();
    let missing = source.fetch("clue-2.mp3").await.unwrap();

    // Assert
    let clip = clip.unwrap();
    assert_eq!(&*clip.bytes, b"ID3clip");
    assert_eq!(clip.media_type, "audio/mpeg");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_asset_source_rejects_nested_keys() {
    let dir = tempfile::tempdir().unwrap();
    let source = DirectoryAssetSource::new(dir.path());

    assert!(source.fetch("../secret.mp3").await.is_err());
}
