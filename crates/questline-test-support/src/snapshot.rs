//! In-memory `SnapshotStore` implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use questline_core::error::DomainError;
use questline_core::snapshot::SnapshotStore;

/// A snapshot store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    documents: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemorySnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one document, e.g. a corrupt session.
    #[must_use]
    pub fn with_document(key: &str, document: serde_json::Value) -> Self {
        let store = Self::default();
        store
            .documents
            .lock()
            .unwrap()
            .insert(key.to_owned(), document);
        store
    }

    /// Returns the document stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn document(&self, key: &str) -> Option<serde_json::Value> {
        self.documents.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        Ok(self.documents.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, document: &serde_json::Value) -> Result<(), DomainError> {
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_owned(), document.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.documents.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Wraps an [`InMemorySnapshotStore`] whose next `failing_saves` saves fail,
/// like a disk that fills up and is then cleared.
#[derive(Debug)]
pub struct FailingSnapshotStore {
    inner: Arc<InMemorySnapshotStore>,
    failing_saves: AtomicUsize,
}

impl FailingSnapshotStore {
    /// Fails the next `failing_saves` saves, then writes through to `inner`.
    #[must_use]
    pub fn new(inner: Arc<InMemorySnapshotStore>, failing_saves: usize) -> Self {
        Self {
            inner,
            failing_saves: AtomicUsize::new(failing_saves),
        }
    }
}

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, DomainError> {
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, document: &serde_json::Value) -> Result<(), DomainError> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::Infrastructure("disk full".into()));
        }
        self.inner.save(key, document).await
    }

    async fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.inner.remove(key).await
    }
}
