//! Append-only JSON-lines implementation of the `EventRepository` trait.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use questline_core::error::DomainError;
use questline_core::repository::{EventRepository, StoredEvent, check_continuation};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Audit trail stored as one `StoredEvent` JSON object per line.
///
/// Sequence numbers are unique per aggregate: an append whose
/// `expected_version` is not the last sequence number already in the
/// stream is rejected and nothing is written.
#[derive(Debug)]
pub struct JsonLinesEventRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesEventRepository {
    /// Creates a repository writing to `path`. Parent directories are created
    /// on the first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The audit file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<StoredEvent>, DomainError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DomainError::Infrastructure(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    DomainError::Infrastructure(format!(
                        "corrupt audit line {} in {}: {e}",
                        index + 1,
                        self.path.display()
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventRepository for JsonLinesEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let mut events: Vec<StoredEvent> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|event| event.aggregate_id == aggregate_id)
            .collect();
        events.sort_by_key(|event| event.sequence_number);
        Ok(events)
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let current = self
            .load_events(aggregate_id)
            .await?
            .last()
            .map_or(0, |event| event.sequence_number);
        if current != expected_version {
            return Err(DomainError::Infrastructure(format!(
                "concurrency conflict on {aggregate_id}: expected version {expected_version}, found {current}"
            )));
        }
        check_continuation(aggregate_id, expected_version, events)?;

        let mut buffer = Vec::new();
        for event in events {
            serde_json::to_writer(&mut buffer, event).map_err(|e| {
                DomainError::Infrastructure(format!("event serialization failed: {e}"))
            })?;
            buffer.push(b'\n');
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::Infrastructure(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                DomainError::Infrastructure(format!("failed to open {}: {e}", self.path.display()))
            })?;
        file.write_all(&buffer).await.map_err(|e| {
            DomainError::Infrastructure(format!("failed to append to {}: {e}", self.path.display()))
        })?;
        file.sync_data().await.map_err(|e| {
            DomainError::Infrastructure(format!("failed to sync {}: {e}", self.path.display()))
        })?;

        debug!(
            aggregate_id = %aggregate_id,
            count = events.len(),
            version = expected_version + i64::try_from(events.len()).unwrap_or(i64::MAX),
            "audit events appended"
        );
        Ok(())
    }
}
