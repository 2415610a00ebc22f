//! Aggregate root for the Quest context.
//!
//! [`QuestSession`] is the single owned value holding a party's progress.
//! Every mutation goes through one of its operations, each of which records
//! a [`QuestEvent`]. Events are applied as they are recorded, so the session
//! is always in its latest state and can be snapshotted directly; the
//! uncommitted events are appended to the audit trail by the handler.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use questline_core::aggregate::AggregateRoot;
use questline_core::clock::Clock;
use questline_core::error::DomainError;
use questline_core::event::EventMetadata;
use questline_verification::{
    GpsAttemptPolicy, Speaker, TranscriptEntry, VerificationMethod, VerificationOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::commands::OverrideAction;
use super::events::{
    ExchangeAppended, FinaleCompleted, GatesUnlocked, GpsAttemptRecorded, HintRevealed,
    OverrideRejected, QuestContinued, QuestEvent, QuestEventKind, QuestStarted,
    VerificationCancelled, VerificationRejected, VerificationStarted, WaypointCompleted,
    WaypointPresented,
};
use super::gate::{GateStatus, evaluate_gate};
use super::waypoint::{QuestDefinition, QuestTuning, WaypointCatalog};

/// Party name used when none is given.
pub const DEFAULT_TEAM_NAME: &str = "Treasure Hunters";

/// Where the party is in the quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "waypoint", rename_all = "snake_case")]
pub enum QuestPhase {
    /// Waiting for the first gesture.
    AwaitingStart,
    /// Searching for waypoint `n`.
    AtWaypoint(u32),
    /// A discovery claim for waypoint `n` is being checked.
    Verifying(u32),
    /// Waypoint `n` was verified; its celebration is showing.
    Celebrating(u32),
    /// Heading to home base.
    AtFinale,
    /// Home base reached.
    Completed,
}

/// Identifies one verification attempt. A result is applied only while its
/// ticket is still the session's pending ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationTicket {
    /// The waypoint (or finale index) the attempt was started for.
    pub waypoint_id: u32,
    /// Attempt identifier.
    pub attempt_id: Uuid,
    /// Whether an asynchronous check (GPS, photo, description) is running.
    /// A bare "found it" claim is not in flight.
    pub in_flight: bool,
}

/// Where a completed verification left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Waypoint `n` was verified.
    Celebrating(u32),
    /// Home base was reached.
    Completed,
    /// Not accepted; the party may try again.
    Retry,
}

/// Result of a hint reveal action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintReveal {
    /// The waypoint.
    pub waypoint_id: u32,
    /// Hint level shown, starting at 1.
    pub level: u32,
    /// Hint text.
    pub text: String,
    /// `false` if every level was already revealed and this is a re-display.
    pub newly_revealed: bool,
}

/// A party's progress through the quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    team_name: String,
    /// 1-based; `N + 1` denotes the finale.
    current_waypoint: u32,
    collected_symbols: Vec<String>,
    hints_used: BTreeMap<u32, u32>,
    /// Conversation for the current waypoint.
    transcript: Vec<TranscriptEntry>,
    audio_unlocked: bool,
    quest_started_at: Option<DateTime<Utc>>,
    finale_completed_at: Option<DateTime<Utc>>,
    waypoint_started_at: BTreeMap<u32, DateTime<Utc>>,
    gps_attempts: BTreeMap<u32, u32>,
    manual_unlocks: BTreeSet<u32>,
    pending: Option<VerificationTicket>,
    phase: QuestPhase,
    /// Uncommitted events pending persistence.
    #[serde(skip)]
    uncommitted_events: Vec<QuestEvent>,
}

impl QuestSession {
    /// Creates a session waiting for the first gesture.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self::blank(id, 0)
    }

    fn blank(id: Uuid, version: i64) -> Self {
        Self {
            id,
            version,
            team_name: DEFAULT_TEAM_NAME.to_owned(),
            current_waypoint: 1,
            collected_symbols: Vec::new(),
            hints_used: BTreeMap::new(),
            transcript: Vec::new(),
            audio_unlocked: false,
            quest_started_at: None,
            finale_completed_at: None,
            waypoint_started_at: BTreeMap::new(),
            gps_attempts: BTreeMap::new(),
            manual_unlocks: BTreeSet::new(),
            pending: None,
            phase: QuestPhase::AwaitingStart,
            uncommitted_events: Vec::new(),
        }
    }

    /// Drops an in-flight verification left over from a previous process.
    /// No asynchronous work survives a reload, so the party is returned to
    /// the waypoint they were checking.
    pub fn normalise_after_load(&mut self) {
        if let QuestPhase::Verifying(n) = self.phase {
            self.phase = QuestPhase::AtWaypoint(n);
        }
        self.pending = None;
        self.uncommitted_events.clear();
    }

    // Queries

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> QuestPhase {
        self.phase
    }

    /// Party name.
    #[must_use]
    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    /// 1-based index of the current stop; `N + 1` is the finale.
    #[must_use]
    pub fn current_waypoint(&self) -> u32 {
        self.current_waypoint
    }

    /// Proof symbols in the order they were collected.
    #[must_use]
    pub fn collected_symbols(&self) -> &[String] {
        &self.collected_symbols
    }

    /// Hint levels revealed at `waypoint_id`.
    #[must_use]
    pub fn hints_used(&self, waypoint_id: u32) -> u32 {
        self.hints_used.get(&waypoint_id).copied().unwrap_or(0)
    }

    /// Hint levels revealed across all waypoints.
    #[must_use]
    pub fn total_hints_used(&self) -> u32 {
        self.hints_used.values().sum()
    }

    /// Conversation for the current waypoint.
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Whether the first gesture has unlocked audio.
    #[must_use]
    pub fn audio_unlocked(&self) -> bool {
        self.audio_unlocked
    }

    /// When the quest started.
    #[must_use]
    pub fn quest_started_at(&self) -> Option<DateTime<Utc>> {
        self.quest_started_at
    }

    /// When home base was reached.
    #[must_use]
    pub fn finale_completed_at(&self) -> Option<DateTime<Utc>> {
        self.finale_completed_at
    }

    /// When `waypoint_id` was first shown.
    #[must_use]
    pub fn waypoint_started_at(&self, waypoint_id: u32) -> Option<DateTime<Utc>> {
        self.waypoint_started_at.get(&waypoint_id).copied()
    }

    /// GPS checks made at `waypoint_id`.
    #[must_use]
    pub fn gps_attempts(&self, waypoint_id: u32) -> u32 {
        self.gps_attempts.get(&waypoint_id).copied().unwrap_or(0)
    }

    /// The attempt currently awaiting a result.
    #[must_use]
    pub fn pending(&self) -> Option<VerificationTicket> {
        self.pending
    }

    /// Waypoint being searched for, if the party is at one.
    #[must_use]
    pub fn active_waypoint(&self) -> Option<u32> {
        match self.phase {
            QuestPhase::AtWaypoint(n) | QuestPhase::Verifying(n) => Some(n),
            _ => None,
        }
    }

    /// Time since the quest started, frozen once home base is reached.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let Some(started) = self.quest_started_at else {
            return Duration::zero();
        };
        let end = self.finale_completed_at.unwrap_or(now);
        (end - started).max(Duration::zero())
    }

    /// Hint gate of the current waypoint.
    #[must_use]
    pub fn hint_status(&self, tuning: &QuestTuning, now: DateTime<Utc>) -> GateStatus {
        self.gate(tuning.hint_delay(), now)
    }

    /// Chat gate of the current waypoint.
    #[must_use]
    pub fn chat_status(&self, tuning: &QuestTuning, now: DateTime<Utc>) -> GateStatus {
        self.gate(tuning.chat_delay(), now)
    }

    fn gate(&self, delay: Duration, now: DateTime<Utc>) -> GateStatus {
        let n = self.current_waypoint;
        evaluate_gate(
            self.waypoint_started_at(n),
            delay,
            self.manual_unlocks.contains(&n),
            now,
        )
    }

    /// GPS policy at the current stop: capped at waypoints, unlimited at
    /// home base.
    #[must_use]
    pub fn gps_policy(&self, tuning: &QuestTuning) -> GpsAttemptPolicy {
        if matches!(self.phase, QuestPhase::AtFinale | QuestPhase::Completed) {
            GpsAttemptPolicy::Unlimited
        } else {
            tuning.waypoint_gps_policy()
        }
    }

    /// GPS checks left at the current stop; `None` means unlimited.
    #[must_use]
    pub fn gps_attempts_remaining(&self, tuning: &QuestTuning) -> Option<u32> {
        self.gps_policy(tuning)
            .remaining(self.gps_attempts(self.current_waypoint))
    }

    // Operations

    /// First gesture: names the party, starts the clock and moves to
    /// waypoint 1.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the quest has already started.
    pub fn start(
        &mut self,
        team_name: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.phase != QuestPhase::AwaitingStart {
            return Err(DomainError::Validation(
                "the quest has already started".to_owned(),
            ));
        }
        let team_name = match team_name.trim() {
            "" => DEFAULT_TEAM_NAME.to_owned(),
            name => name.to_owned(),
        };
        let now = clock.now();
        self.record(
            QuestEventKind::QuestStarted(QuestStarted {
                team_name,
                started_at: now,
            }),
            correlation_id,
            clock,
        );
        self.mark_presented(1, correlation_id, clock);
        Ok(())
    }

    /// Shows the current stop, starting its timers the first time.
    /// Returns the stop's index.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is no stop to show.
    pub fn present_waypoint(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<u32, DomainError> {
        match self.phase {
            QuestPhase::AtWaypoint(n) | QuestPhase::Verifying(n) => {
                self.mark_presented(n, correlation_id, clock);
                Ok(n)
            }
            QuestPhase::AtFinale => Ok(self.current_waypoint),
            _ => Err(DomainError::Validation(
                "there is no waypoint to show right now".to_owned(),
            )),
        }
    }

    fn mark_presented(&mut self, waypoint_id: u32, correlation_id: Uuid, clock: &dyn Clock) {
        if self.waypoint_started_at.contains_key(&waypoint_id) {
            return;
        }
        let now = clock.now();
        self.record(
            QuestEventKind::WaypointPresented(WaypointPresented {
                waypoint_id,
                started_at: now,
            }),
            correlation_id,
            clock,
        );
    }

    /// Opens a verification attempt at the current stop.
    ///
    /// A bare discovery claim (`in_flight == false`) is idempotent. An
    /// in-flight check may take over a claim, but never another in-flight
    /// check.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is nothing to verify or a
    /// check is already running.
    pub fn begin_verification(
        &mut self,
        attempt_id: Uuid,
        in_flight: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<VerificationTicket, DomainError> {
        let waypoint_id = match self.phase {
            QuestPhase::AtWaypoint(n) | QuestPhase::Verifying(n) => n,
            QuestPhase::AtFinale => self.current_waypoint,
            _ => {
                return Err(DomainError::Validation(
                    "there is nothing to verify right now".to_owned(),
                ));
            }
        };

        if let Some(pending) = self.pending {
            if pending.in_flight {
                return Err(DomainError::Validation(
                    "a verification is already in progress".to_owned(),
                ));
            }
            if !in_flight {
                return Ok(pending);
            }
        }

        self.record(
            QuestEventKind::VerificationStarted(VerificationStarted {
                waypoint_id,
                attempt_id,
                in_flight,
            }),
            correlation_id,
            clock,
        );
        Ok(VerificationTicket {
            waypoint_id,
            attempt_id,
            in_flight,
        })
    }

    /// Applies the outcome of the attempt identified by `ticket`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StaleOutcome` if `ticket` is no longer the
    /// pending attempt, and `DomainError::NotFound` if the waypoint is not
    /// in `catalog`.
    pub fn complete_verification(
        &mut self,
        ticket: VerificationTicket,
        outcome: &VerificationOutcome,
        catalog: &WaypointCatalog,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Resolution, DomainError> {
        let current = self
            .pending
            .filter(|p| p.attempt_id == ticket.attempt_id && p.waypoint_id == ticket.waypoint_id);
        if current.is_none() {
            return Err(DomainError::StaleOutcome {
                waypoint_id: ticket.waypoint_id,
                attempt_id: ticket.attempt_id,
            });
        }

        if !outcome.is_accepted() {
            self.record(
                QuestEventKind::VerificationRejected(VerificationRejected {
                    waypoint_id: ticket.waypoint_id,
                    attempt_id: ticket.attempt_id,
                    method: outcome.method,
                    kind: outcome.kind,
                    distance_meters: outcome.distance_meters,
                    confidence: outcome.confidence,
                }),
                correlation_id,
                clock,
            );
            return Ok(Resolution::Retry);
        }

        if ticket.waypoint_id == catalog.finale_index() {
            self.complete_finale(correlation_id, clock)?;
            return Ok(Resolution::Completed);
        }

        self.complete_waypoint(ticket.waypoint_id, outcome.method, catalog, correlation_id, clock)?;
        Ok(Resolution::Celebrating(ticket.waypoint_id))
    }

    fn complete_waypoint(
        &mut self,
        waypoint_id: u32,
        method: VerificationMethod,
        catalog: &WaypointCatalog,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if waypoint_id != self.current_waypoint {
            return Err(DomainError::InvariantViolation(format!(
                "cannot complete waypoint {waypoint_id} while at waypoint {}",
                self.current_waypoint
            )));
        }
        let symbol = catalog.require(waypoint_id)?.symbol.clone();
        self.record(
            QuestEventKind::WaypointCompleted(WaypointCompleted {
                waypoint_id,
                symbol,
                method,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Abandons the pending attempt. A no-op when nothing is pending.
    pub fn cancel_verification(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let Some(pending) = self.pending else {
            return;
        };
        self.record(
            QuestEventKind::VerificationCancelled(VerificationCancelled {
                waypoint_id: pending.waypoint_id,
                attempt_id: pending.attempt_id,
            }),
            correlation_id,
            clock,
        );
    }

    /// Leaves the celebration of waypoint `n` for waypoint `n + 1`, or for
    /// home base after the last waypoint.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside a celebration, and
    /// `DomainError::InvariantViolation` if the index does not follow the
    /// celebrated waypoint.
    pub fn continue_quest(
        &mut self,
        catalog: &WaypointCatalog,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<QuestPhase, DomainError> {
        let QuestPhase::Celebrating(n) = self.phase else {
            return Err(DomainError::Validation(
                "there is no celebration to continue from".to_owned(),
            ));
        };
        if self.current_waypoint != n + 1 {
            return Err(DomainError::InvariantViolation(format!(
                "celebrating waypoint {n} but the session is at waypoint {}",
                self.current_waypoint
            )));
        }

        let to_finale = n >= catalog.len();
        self.record(
            QuestEventKind::QuestContinued(QuestContinued {
                from_waypoint: n,
                to_finale,
            }),
            correlation_id,
            clock,
        );
        if !to_finale {
            self.mark_presented(n + 1, correlation_id, clock);
        }
        Ok(self.phase)
    }

    /// Marks home base reached. Repeated calls keep the first timestamp.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the party is at home base.
    pub fn complete_finale(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        match self.phase {
            QuestPhase::Completed => Ok(()),
            QuestPhase::AtFinale => {
                let now = clock.now();
                self.record(
                    QuestEventKind::FinaleCompleted(FinaleCompleted { completed_at: now }),
                    correlation_id,
                    clock,
                );
                Ok(())
            }
            _ => Err(DomainError::Validation(
                "home base is not the current stop".to_owned(),
            )),
        }
    }

    /// Reveals the next hint level of the current waypoint, or re-displays
    /// the last one once every level is shown.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is no active waypoint or
    /// the hint gate is closed.
    pub fn reveal_hint(
        &mut self,
        catalog: &WaypointCatalog,
        tuning: &QuestTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<HintReveal, DomainError> {
        let Some(waypoint_id) = self.active_waypoint() else {
            return Err(DomainError::Validation(
                "hints are only available at a waypoint".to_owned(),
            ));
        };
        if let GateStatus::Locked { remaining_secs } = self.hint_status(tuning, clock.now()) {
            return Err(DomainError::Validation(format!(
                "hints unlock in {}:{:02}",
                remaining_secs / 60,
                remaining_secs % 60
            )));
        }

        let hints = &catalog.require(waypoint_id)?.hints;
        let total = u32::try_from(hints.len()).unwrap_or(u32::MAX);
        let used = self.hints_used(waypoint_id);
        let (level, newly_revealed) = if used < total {
            (used + 1, true)
        } else {
            (total, false)
        };
        let text = usize::try_from(level - 1)
            .ok()
            .and_then(|i| hints.get(i))
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("hint {level} of waypoint {waypoint_id}")))?;

        if newly_revealed {
            self.record(
                QuestEventKind::HintRevealed(HintRevealed { waypoint_id, level }),
                correlation_id,
                clock,
            );
        }
        Ok(HintReveal {
            waypoint_id,
            level,
            text,
            newly_revealed,
        })
    }

    /// Facilitator escape. Returns whether the passcode was accepted.
    ///
    /// A wrong passcode, or any passcode when none is configured, is
    /// recorded and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is no active waypoint.
    pub fn attempt_override(
        &mut self,
        passcode: &str,
        action: OverrideAction,
        definition: &QuestDefinition,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<bool, DomainError> {
        let QuestDefinition { tuning, catalog } = definition;
        let Some(waypoint_id) = self.active_waypoint() else {
            return Err(DomainError::Validation(
                "the override is only available at a waypoint".to_owned(),
            ));
        };

        let accepted = tuning
            .override_passcode
            .as_deref()
            .is_some_and(|expected| expected == passcode.trim());
        if !accepted {
            warn!(waypoint_id, "override passcode rejected");
            self.record(
                QuestEventKind::OverrideRejected(OverrideRejected { waypoint_id }),
                correlation_id,
                clock,
            );
            return Ok(false);
        }

        match action {
            OverrideAction::SkipWaypoint => {
                warn!(waypoint_id, "waypoint skipped by facilitator override");
                self.complete_waypoint(
                    waypoint_id,
                    VerificationMethod::Override,
                    catalog,
                    correlation_id,
                    clock,
                )?;
            }
            OverrideAction::UnlockHints => {
                warn!(waypoint_id, "hints and chat unlocked by facilitator override");
                if !self.manual_unlocks.contains(&waypoint_id) {
                    self.record(
                        QuestEventKind::GatesUnlocked(GatesUnlocked { waypoint_id }),
                        correlation_id,
                        clock,
                    );
                }
            }
        }
        Ok(true)
    }

    /// Adds a line to the current waypoint's conversation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there is no active waypoint.
    pub fn append_exchange(
        &mut self,
        speaker: Speaker,
        text: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let Some(waypoint_id) = self.active_waypoint() else {
            return Err(DomainError::Validation(
                "chat is only available at a waypoint".to_owned(),
            ));
        };
        self.record(
            QuestEventKind::ExchangeAppended(ExchangeAppended {
                waypoint_id,
                speaker,
                text: text.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Counts a GPS check at the current stop against `policy`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` once the policy's cap is reached.
    pub fn record_gps_attempt(
        &mut self,
        policy: GpsAttemptPolicy,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<u32, DomainError> {
        let waypoint_id = self.current_waypoint;
        let made = self.gps_attempts(waypoint_id);
        if !policy.permits(made) {
            return Err(DomainError::Validation(
                "GPS attempts exhausted. Use photo verification instead.".to_owned(),
            ));
        }
        self.record(
            QuestEventKind::GpsAttemptRecorded(GpsAttemptRecorded {
                waypoint_id,
                attempts: made + 1,
            }),
            correlation_id,
            clock,
        );
        Ok(made + 1)
    }

    /// Returns the session to its defaults. Identity and version are kept
    /// so the audit stream continues.
    pub fn reset(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(QuestEventKind::QuestReset, correlation_id, clock);
    }

    fn record(&mut self, kind: QuestEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = QuestEvent {
            metadata: EventMetadata::caused_by_command(
                kind.type_name(),
                self.id,
                self.next_sequence(),
                correlation_id,
                clock,
            ),
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for QuestSession {
    type Event = QuestEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            QuestEventKind::QuestStarted(payload) => {
                self.team_name.clone_from(&payload.team_name);
                self.quest_started_at.get_or_insert(payload.started_at);
                self.current_waypoint = 1;
                self.audio_unlocked = true;
                self.phase = QuestPhase::AtWaypoint(1);
            }
            QuestEventKind::WaypointPresented(payload) => {
                self.waypoint_started_at
                    .entry(payload.waypoint_id)
                    .or_insert(payload.started_at);
            }
            QuestEventKind::VerificationStarted(payload) => {
                self.pending = Some(VerificationTicket {
                    waypoint_id: payload.waypoint_id,
                    attempt_id: payload.attempt_id,
                    in_flight: payload.in_flight,
                });
                if let QuestPhase::AtWaypoint(n) = self.phase {
                    self.phase = QuestPhase::Verifying(n);
                }
            }
            QuestEventKind::GpsAttemptRecorded(payload) => {
                self.gps_attempts
                    .insert(payload.waypoint_id, payload.attempts);
            }
            QuestEventKind::VerificationRejected(_) | QuestEventKind::VerificationCancelled(_) => {
                self.pending = None;
                if let QuestPhase::Verifying(n) = self.phase {
                    self.phase = QuestPhase::AtWaypoint(n);
                }
            }
            QuestEventKind::WaypointCompleted(payload) => {
                self.collected_symbols.push(payload.symbol.clone());
                self.current_waypoint = payload.waypoint_id + 1;
                self.transcript.clear();
                self.pending = None;
                self.phase = QuestPhase::Celebrating(payload.waypoint_id);
            }
            QuestEventKind::QuestContinued(payload) => {
                self.phase = if payload.to_finale {
                    QuestPhase::AtFinale
                } else {
                    QuestPhase::AtWaypoint(payload.from_waypoint + 1)
                };
            }
            QuestEventKind::FinaleCompleted(payload) => {
                self.finale_completed_at.get_or_insert(payload.completed_at);
                self.pending = None;
                self.phase = QuestPhase::Completed;
            }
            QuestEventKind::HintRevealed(payload) => {
                self.hints_used.insert(payload.waypoint_id, payload.level);
            }
            QuestEventKind::GatesUnlocked(payload) => {
                self.manual_unlocks.insert(payload.waypoint_id);
            }
            QuestEventKind::OverrideRejected(_) => {}
            QuestEventKind::ExchangeAppended(payload) => {
                self.transcript.push(TranscriptEntry {
                    speaker: payload.speaker,
                    text: payload.text.clone(),
                });
            }
            QuestEventKind::QuestReset => {
                let uncommitted = std::mem::take(&mut self.uncommitted_events);
                *self = Self::blank(self.id, self.version);
                self.uncommitted_events = uncommitted;
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
