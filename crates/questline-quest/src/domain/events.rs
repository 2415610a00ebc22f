//! Domain events for the Quest context.
//!
//! Events are the audit trail of every transition; the live state is the
//! session snapshot.

use chrono::{DateTime, Utc};
use questline_core::event::{DomainEvent, EventMetadata};
use questline_verification::{OutcomeKind, Speaker, VerificationMethod};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted on the first gesture: the party is named and the clock starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestStarted {
    /// Party name.
    pub team_name: String,
    /// Quest start time.
    pub started_at: DateTime<Utc>,
}

/// Emitted the first time a waypoint is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointPresented {
    /// The waypoint.
    pub waypoint_id: u32,
    /// When its timers started.
    pub started_at: DateTime<Utc>,
}

/// Emitted when a verification attempt begins or a claim becomes an
/// in-flight check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationStarted {
    /// The waypoint (or finale index) being verified.
    pub waypoint_id: u32,
    /// Attempt identifier.
    pub attempt_id: Uuid,
    /// Whether an asynchronous check is running.
    pub in_flight: bool,
}

/// Emitted each time a GPS check is started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsAttemptRecorded {
    /// The waypoint (or finale index).
    pub waypoint_id: u32,
    /// Attempts made so far, including this one.
    pub attempts: u32,
}

/// Emitted when an attempt ends without acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRejected {
    /// The waypoint (or finale index).
    pub waypoint_id: u32,
    /// Attempt identifier.
    pub attempt_id: Uuid,
    /// Strategy that ran.
    pub method: VerificationMethod,
    /// How it ended.
    pub kind: OutcomeKind,
    /// GPS distance, if any.
    pub distance_meters: Option<u32>,
    /// Photo confidence, if any.
    pub confidence: Option<u8>,
}

/// Emitted when the participants back out of a verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCancelled {
    /// The waypoint (or finale index).
    pub waypoint_id: u32,
    /// Attempt identifier.
    pub attempt_id: Uuid,
}

/// Emitted when a waypoint is verified, by any method including override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointCompleted {
    /// The waypoint.
    pub waypoint_id: u32,
    /// The proof symbol collected.
    pub symbol: String,
    /// How it was verified.
    pub method: VerificationMethod,
}

/// Emitted when the participants leave the celebration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestContinued {
    /// The waypoint whose celebration ended.
    pub from_waypoint: u32,
    /// `true` if the next stop is home base.
    pub to_finale: bool,
}

/// Emitted once, when the home-base check succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinaleCompleted {
    /// Completion time; freezes the elapsed timer.
    pub completed_at: DateTime<Utc>,
}

/// Emitted when a hint level is revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintRevealed {
    /// The waypoint.
    pub waypoint_id: u32,
    /// Hint level now revealed, starting at 1.
    pub level: u32,
}

/// Emitted when a facilitator opens the hint and chat gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatesUnlocked {
    /// The waypoint.
    pub waypoint_id: u32,
}

/// Emitted on a wrong override passcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRejected {
    /// The waypoint the override was attempted at.
    pub waypoint_id: u32,
}

/// Emitted for each line added to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeAppended {
    /// The waypoint the conversation belongs to.
    pub waypoint_id: u32,
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
}

/// Event payload variants for the Quest context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuestEventKind {
    /// The quest has started.
    QuestStarted(QuestStarted),
    /// A waypoint was shown for the first time.
    WaypointPresented(WaypointPresented),
    /// A verification attempt began.
    VerificationStarted(VerificationStarted),
    /// A GPS check was counted.
    GpsAttemptRecorded(GpsAttemptRecorded),
    /// An attempt ended without acceptance.
    VerificationRejected(VerificationRejected),
    /// An attempt was abandoned.
    VerificationCancelled(VerificationCancelled),
    /// A waypoint was verified.
    WaypointCompleted(WaypointCompleted),
    /// The celebration ended.
    QuestContinued(QuestContinued),
    /// Home base reached.
    FinaleCompleted(FinaleCompleted),
    /// A hint level was revealed.
    HintRevealed(HintRevealed),
    /// Gates opened by a facilitator.
    GatesUnlocked(GatesUnlocked),
    /// A wrong passcode was entered.
    OverrideRejected(OverrideRejected),
    /// A conversation line was added.
    ExchangeAppended(ExchangeAppended),
    /// The session returned to its defaults.
    QuestReset,
}

/// Domain event envelope for the Quest context.
#[derive(Debug, Clone)]
pub struct QuestEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: QuestEventKind,
}

impl QuestEventKind {
    /// Stable type name of this payload.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::QuestStarted(_) => "quest.started",
            Self::WaypointPresented(_) => "quest.waypoint_presented",
            Self::VerificationStarted(_) => "quest.verification_started",
            Self::GpsAttemptRecorded(_) => "quest.gps_attempt_recorded",
            Self::VerificationRejected(_) => "quest.verification_rejected",
            Self::VerificationCancelled(_) => "quest.verification_cancelled",
            Self::WaypointCompleted(_) => "quest.waypoint_completed",
            Self::QuestContinued(_) => "quest.continued",
            Self::FinaleCompleted(_) => "quest.finale_completed",
            Self::HintRevealed(_) => "quest.hint_revealed",
            Self::GatesUnlocked(_) => "quest.gates_unlocked",
            Self::OverrideRejected(_) => "quest.override_rejected",
            Self::ExchangeAppended(_) => "quest.exchange_appended",
            Self::QuestReset => "quest.reset",
        }
    }
}

impl DomainEvent for QuestEvent {
    fn event_type(&self) -> &'static str {
        self.kind.type_name()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("QuestEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
