//! The quest's audit trail: an append-only log of every session transition.
//!
//! Live state is kept as a snapshot (see [`crate::snapshot::SnapshotStore`]);
//! this log exists so a facilitator can reconstruct what happened,
//! overrides included.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    /// The quest session that recorded the event.
    pub aggregate_id: Uuid,
    /// Namespaced name, e.g. `quest.waypoint_completed`.
    pub event_type: String,
    pub payload: serde_json::Value,
    /// Position in the session's stream, starting at 1.
    pub sequence_number: i64,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Flattens a recorded domain event into its audit form.
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        }
    }
}

/// Checks that `events` belong to `aggregate_id` and number on, without
/// gaps, from `expected_version + 1`.
///
/// # Errors
///
/// Returns `DomainError::InvariantViolation` naming the first event out of
/// place.
pub fn check_continuation(
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    for (next, event) in (expected_version + 1..).zip(events) {
        if event.aggregate_id != aggregate_id || event.sequence_number != next {
            return Err(DomainError::InvariantViolation(format!(
                "event {} does not continue stream {aggregate_id} at version {next}",
                event.event_id
            )));
        }
    }
    Ok(())
}

/// Storage for the audit trail.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Every event of one session, oldest first.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Appends `events` to a session's stream.
    ///
    /// `expected_version` is the sequence number of the last event the
    /// caller knows about; a stream that has moved on is a conflict.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;
}
