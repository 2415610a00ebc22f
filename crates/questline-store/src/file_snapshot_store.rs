//! `SnapshotStore` backed by one JSON file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use questline_core::error::DomainError;
use questline_core::snapshot::SnapshotStore;
use tracing::debug;

use crate::is_plain_file_name;

/// Stores each document as `<root>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store rooted at `root`. The directory is created on the
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DomainError> {
        if !is_plain_file_name(key) {
            return Err(DomainError::Validation(format!(
                "invalid snapshot key: {key:?}"
            )));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DomainError::Infrastructure(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        let document = serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::Infrastructure(format!("corrupt snapshot {}: {e}", path.display()))
        })?;
        Ok(Some(document))
    }

    async fn save(&self, key: &str, document: &serde_json::Value) -> Result<(), DomainError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| {
            DomainError::Infrastructure(format!("snapshot serialization failed: {e}"))
        })?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            DomainError::Infrastructure(format!(
                "failed to create {}: {e}",
                self.root.display()
            ))
        })?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, &bytes).await.map_err(|e| {
            DomainError::Infrastructure(format!("failed to write {}: {e}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &path).await.map_err(|e| {
            DomainError::Infrastructure(format!("failed to replace {}: {e}", path.display()))
        })?;

        debug!(key, bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Infrastructure(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}
