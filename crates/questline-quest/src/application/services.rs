//! Collaborators of the quest handlers and the owned session slot.
//!
//! The session is loaded lazily from the snapshot store the first time a
//! handler needs it and stays in memory afterwards. Every change runs
//! through [`QuestServices::transact`]: the snapshot is the live state and
//! is saved before the in-memory session is replaced; the audit trail
//! follows. Events the trail could not take are kept under
//! [`AUDIT_BACKLOG_KEY`] and retried on the next change.

use std::sync::{Arc, Mutex};

use questline_core::aggregate::AggregateRoot;
use questline_core::clock::Clock;
use questline_core::error::DomainError;
use questline_core::repository::{EventRepository, StoredEvent};
use questline_core::rng::DeterministicRng;
use questline_core::snapshot::SnapshotStore;
use questline_narration::{NarrationContent, NarrationOrchestrator, NarrationUnit};
use questline_verification::{
    ChatService, DescriptionStrategy, GeolocationProvider, GpsStrategy, PhotoStrategy,
    VisionService,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::QuestSession;
use crate::domain::waypoint::QuestDefinition;

/// Snapshot key of the quest session.
pub const SESSION_KEY: &str = "quest-session";

/// Snapshot key of audit events not yet accepted by the trail.
pub const AUDIT_BACKLOG_KEY: &str = "quest-audit-backlog";

#[derive(Default)]
struct Slot {
    session: Option<QuestSession>,
    unaudited: Vec<StoredEvent>,
}

/// External ports the quest depends on.
pub struct QuestPorts {
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
    /// Randomness for follow-up selection.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Session persistence.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Audit trail of quest events.
    pub audit: Arc<dyn EventRepository>,
    /// Spoken guidance.
    pub narration: Arc<NarrationOrchestrator>,
    /// Conversational guide.
    pub chat: Arc<dyn ChatService>,
    /// Photo inspection.
    pub vision: Arc<dyn VisionService>,
    /// Device position.
    pub geolocation: Arc<dyn GeolocationProvider>,
}

/// Everything a quest handler needs.
pub struct QuestServices {
    /// Authored content and tuning.
    pub definition: Arc<QuestDefinition>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
    /// Randomness for follow-up selection.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Spoken guidance.
    pub narration: Arc<NarrationOrchestrator>,
    /// Conversational guide.
    pub chat: Arc<dyn ChatService>,
    /// Photo inspection.
    pub vision: Arc<dyn VisionService>,
    /// Device position.
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub(crate) gps: GpsStrategy,
    pub(crate) photo: PhotoStrategy,
    pub(crate) description: DescriptionStrategy,
    snapshots: Arc<dyn SnapshotStore>,
    audit: Arc<dyn EventRepository>,
    slot: tokio::sync::Mutex<Slot>,
}

impl std::fmt::Debug for QuestServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestServices")
            .field("waypoints", &self.definition.catalog.len())
            .field("gps", &self.gps)
            .field("photo", &self.photo)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl QuestServices {
    /// Wires the strategies from the tuning and takes ownership of the ports.
    #[must_use]
    pub fn new(definition: QuestDefinition, ports: QuestPorts) -> Self {
        let tuning = &definition.tuning;
        let gps = GpsStrategy::new(tuning.geolocation_timeout());
        let photo = PhotoStrategy::new(tuning.photo_thresholds());
        let description = DescriptionStrategy::new(tuning.description_match_threshold);
        Self {
            definition: Arc::new(definition),
            clock: ports.clock,
            rng: ports.rng,
            narration: ports.narration,
            chat: ports.chat,
            vision: ports.vision,
            geolocation: ports.geolocation,
            gps,
            photo,
            description,
            snapshots: ports.snapshots,
            audit: ports.audit,
            slot: tokio::sync::Mutex::new(Slot::default()),
        }
    }

    /// Returns a copy of the current session, loading it on first use.
    pub async fn current_session(&self) -> QuestSession {
        let mut slot = self.slot.lock().await;
        self.loaded(&mut slot).await.clone()
    }

    /// Runs `change` against a working copy of the session and commits it.
    ///
    /// The new snapshot is saved before the in-memory session is replaced.
    /// If `change` or the save fails, nothing is committed and the command
    /// can simply be retried. An audit trail that refuses the events does
    /// not fail the command: they are kept for the next attempt.
    ///
    /// # Errors
    ///
    /// Returns the error from `change`, or `DomainError::Infrastructure` if
    /// the snapshot cannot be saved.
    pub async fn transact<T, F>(&self, change: F) -> Result<(T, QuestSession), DomainError>
    where
        F: FnOnce(&mut QuestSession, &QuestDefinition, &dyn Clock) -> Result<T, DomainError>,
    {
        let mut slot = self.slot.lock().await;
        let mut working = self.loaded(&mut slot).await.clone();

        let value = change(&mut working, &self.definition, self.clock.as_ref())?;
        if !working.uncommitted_events().is_empty() {
            self.save_snapshot(&working).await?;
            let had_backlog = !slot.unaudited.is_empty();
            slot.unaudited.extend(
                working
                    .uncommitted_events()
                    .iter()
                    .map(|event| StoredEvent::from_event(event)),
            );
            working.clear_uncommitted_events();
            self.flush_audit(&mut slot.unaudited, had_backlog).await;
        }

        slot.session = Some(working.clone());
        Ok((value, working))
    }

    async fn save_snapshot(&self, session: &QuestSession) -> Result<(), DomainError> {
        let document = serde_json::to_value(session).map_err(|e| {
            DomainError::Infrastructure(format!("session serialization failed: {e}"))
        })?;
        self.snapshots.save(SESSION_KEY, &document).await
    }

    /// Appends the backlog to the trail, one session stream at a time, and
    /// records whatever is left.
    async fn flush_audit(&self, unaudited: &mut Vec<StoredEvent>, had_backlog: bool) {
        while let Some(first) = unaudited.first() {
            let aggregate_id = first.aggregate_id;
            let expected_version = first.sequence_number - 1;
            let run = unaudited
                .iter()
                .take_while(|event| event.aggregate_id == aggregate_id)
                .count();
            let appended = self
                .audit
                .append_events(aggregate_id, expected_version, &unaudited[..run])
                .await;
            match appended {
                Ok(()) => {
                    unaudited.drain(..run);
                }
                Err(error) => {
                    if !self.realign(aggregate_id, unaudited).await {
                        warn!(
                            error = %error,
                            pending = unaudited.len(),
                            "audit trail append failed, retrying on the next change"
                        );
                        break;
                    }
                }
            }
        }

        if unaudited.is_empty() {
            if had_backlog {
                if let Err(error) = self.snapshots.remove(AUDIT_BACKLOG_KEY).await {
                    warn!(error = %error, "could not clear the audit backlog");
                }
            }
        } else if let Err(error) = self.save_backlog(unaudited).await {
            warn!(error = %error, "could not record the audit backlog");
        }
    }

    /// Drops backlog events the trail already holds, or that can never
    /// follow it. Returns `false` if nothing changed.
    async fn realign(&self, aggregate_id: Uuid, unaudited: &mut Vec<StoredEvent>) -> bool {
        let Ok(recorded) = self.audit.load_events(aggregate_id).await else {
            return false;
        };
        let last = recorded.last().map_or(0, |event| event.sequence_number);
        let before = unaudited.len();
        unaudited.retain(|event| event.aggregate_id != aggregate_id || event.sequence_number > last);
        if unaudited.len() < before {
            return true;
        }

        let Some(first_pending) = unaudited.first().map(|event| event.sequence_number) else {
            return false;
        };
        if first_pending <= last + 1 {
            return false;
        }
        let run = unaudited
            .iter()
            .take_while(|event| event.aggregate_id == aggregate_id)
            .count();
        warn!(
            session_id = %aggregate_id,
            trail_version = last,
            first_pending,
            dropped = run,
            "audit trail is missing events, dropping what cannot follow it"
        );
        unaudited.drain(..run);
        true
    }

    async fn save_backlog(&self, unaudited: &[StoredEvent]) -> Result<(), DomainError> {
        let document = serde_json::to_value(unaudited).map_err(|e| {
            DomainError::Infrastructure(format!("audit backlog serialization failed: {e}"))
        })?;
        self.snapshots.save(AUDIT_BACKLOG_KEY, &document).await
    }

    async fn loaded<'a>(&self, slot: &'a mut Slot) -> &'a mut QuestSession {
        if slot.session.is_none() {
            slot.session = Some(self.load_session().await);
            slot.unaudited = self.load_backlog().await;
        }
        slot.session.get_or_insert_with(|| QuestSession::new(Uuid::new_v4()))
    }

    async fn load_backlog(&self) -> Vec<StoredEvent> {
        match self.snapshots.load(AUDIT_BACKLOG_KEY).await {
            Ok(Some(document)) => serde_json::from_value(document).unwrap_or_else(|error| {
                warn!(error = %error, "discarding unreadable audit backlog");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(error = %error, "could not read the audit backlog");
                Vec::new()
            }
        }
    }

    /// A missing, unreadable or undecodable snapshot starts a fresh session.
    async fn load_session(&self) -> QuestSession {
        let document = match self.snapshots.load(SESSION_KEY).await {
            Ok(Some(document)) => document,
            Ok(None) => return QuestSession::new(Uuid::new_v4()),
            Err(error) => {
                warn!(error = %error, "could not read session snapshot, starting fresh");
                return QuestSession::new(Uuid::new_v4());
            }
        };
        match serde_json::from_value::<QuestSession>(document) {
            Ok(mut session) => {
                session.normalise_after_load();
                info!(
                    session_id = %session.id,
                    waypoint = session.current_waypoint(),
                    "restored quest session"
                );
                session
            }
            Err(error) => {
                warn!(error = %error, "discarding unreadable session snapshot");
                QuestSession::new(Uuid::new_v4())
            }
        }
    }

    /// Speakable content for `unit`, or `None` if nothing is authored.
    #[must_use]
    pub fn narration_content(&self, unit: NarrationUnit) -> Option<NarrationContent> {
        let catalog = &self.definition.catalog;
        let markdown = match unit {
            NarrationUnit::Intro => catalog.intro.clone(),
            NarrationUnit::Clue(n) if n == catalog.finale_index() => {
                catalog.finale.narration.clone()
            }
            NarrationUnit::Clue(n) => catalog.get(n)?.narration.clone(),
            NarrationUnit::Celebration(n) => catalog.get(n)?.celebration_text(),
            NarrationUnit::Finale => catalog.finale.celebration.clone(),
        };
        let content = NarrationContent::from_markdown(unit, &markdown);
        (!content.is_empty()).then_some(content)
    }
}
