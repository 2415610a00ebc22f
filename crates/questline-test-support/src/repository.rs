//! In-memory audit trails for the `EventRepository` seam.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use questline_core::error::DomainError;
use questline_core::repository::{EventRepository, StoredEvent, check_continuation};
use uuid::Uuid;

/// An audit trail kept in memory.
///
/// Appends are checked the way the file-backed trail checks them: the
/// expected version must match the last stored sequence number, so a test
/// that commits out of order fails loudly.
#[derive(Debug, Default)]
pub struct RecordingEventRepository {
    events: Mutex<Vec<StoredEvent>>,
    failing_appends: AtomicUsize,
}

impl RecordingEventRepository {
    /// Create an empty trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses the next `count` appends, as a trail on unavailable storage
    /// would.
    pub fn fail_next_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Every stored event, in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<StoredEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The type of every stored event, in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// The first stored event of `event_type`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn find(&self, event_type: &str) -> Option<StoredEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|event| event.event_type == event_type)
            .cloned()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let refused = self
            .failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(DomainError::Infrastructure("audit trail unavailable".into()));
        }
        let mut stored = self.events.lock().unwrap();
        let current = stored
            .iter()
            .filter(|event| event.aggregate_id == aggregate_id)
            .map(|event| event.sequence_number)
            .max()
            .unwrap_or(0);
        if current != expected_version {
            return Err(DomainError::Infrastructure(format!(
                "concurrency conflict on {aggregate_id}: expected version {expected_version}, found {current}"
            )));
        }
        check_continuation(aggregate_id, expected_version, events)?;
        stored.extend_from_slice(events);
        Ok(())
    }
}

/// An audit trail whose storage is gone: every call fails with an
/// infrastructure error.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("audit trail unavailable".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("audit trail unavailable".into()))
    }
}
