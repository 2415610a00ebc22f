//! Snapshot persistence abstraction.

use async_trait::async_trait;

use crate::error::DomainError;

/// Key/value store of JSON documents.
///
/// A document is written and read back verbatim. Callers decide what an
/// absent or undecodable document means; the quest treats both as "start
/// fresh".
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the document stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError>;

    /// Replaces the document stored under `key`.
    async fn save(&self, key: &str, document: &serde_json::Value) -> Result<(), DomainError>;

    /// Removes the document stored under `key`. Removing a missing key is not
    /// an error.
    async fn remove(&self, key: &str) -> Result<(), DomainError>;
}
