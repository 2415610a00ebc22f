//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// An aggregate whose changes are recorded as events and applied as they
/// are recorded. Uncommitted events wait for the audit trail.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate records.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Number of events applied, committed or not.
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Events recorded since the last commit.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events once the audit trail holds them.
    fn clear_uncommitted_events(&mut self);

    /// Version the audit trail has seen: the expected version for the
    /// next append.
    fn committed_version(&self) -> i64 {
        let pending = i64::try_from(self.uncommitted_events().len()).unwrap_or(i64::MAX);
        self.version().saturating_sub(pending)
    }

    /// Sequence number for the next recorded event.
    fn next_sequence(&self) -> i64 {
        self.version() + 1
    }
}
