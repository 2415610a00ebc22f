//! Query handlers for the Quest context.
//!
//! Views are derived from the session and the clock on every call; the
//! gates and the elapsed timer are never stored.

use chrono::{DateTime, Duration, Utc};
use questline_verification::TranscriptEntry;
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::QuestServices;
use crate::domain::aggregates::{QuestPhase, QuestSession};
use crate::domain::gate::GateStatus;
use crate::domain::waypoint::QuestDefinition;

/// Read-only view of the waypoint on screen.
#[derive(Debug, Serialize)]
pub struct WaypointView {
    /// Waypoint id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Clue text (markdown).
    pub narration: String,
    /// Reference citation.
    pub scripture: String,
    /// Reference text.
    pub scripture_text: String,
    /// Hints revealed so far, in order.
    pub revealed_hints: Vec<String>,
    /// Total hint levels.
    pub total_hints: u32,
    /// Whether a GPS check is possible here.
    pub has_gps_target: bool,
    /// Backup keyword.
    pub backup_keyword: Option<String>,
    /// Celebration text, once verified.
    pub celebration: Option<String>,
}

/// Read-only view of home base.
#[derive(Debug, Serialize)]
pub struct FinaleView {
    /// Display name.
    pub name: String,
    /// Finale symbol.
    pub symbol: String,
    /// Directions home (markdown).
    pub narration: String,
    /// Closing text, once reached.
    pub celebration: Option<String>,
}

/// Read-only view of the quest session.
#[derive(Debug, Serialize)]
pub struct QuestView {
    /// Session identifier.
    pub session_id: Uuid,
    /// Current phase.
    pub phase: QuestPhase,
    /// Party name.
    pub team_name: String,
    /// 1-based index of the current stop; `total_waypoints + 1` is home base.
    pub current_waypoint: u32,
    /// Number of waypoints before home base.
    pub total_waypoints: u32,
    /// The waypoint on screen, if any.
    pub waypoint: Option<WaypointView>,
    /// Home base, once the party is heading there.
    pub finale: Option<FinaleView>,
    /// Proof symbols collected so far.
    pub collected_symbols: Vec<String>,
    /// Hint levels revealed across the quest.
    pub hints_used: u32,
    /// Hint gate of the current waypoint.
    pub hint_gate: GateStatus,
    /// Chat gate of the current waypoint.
    pub chat_gate: GateStatus,
    /// GPS checks left here; `None` means unlimited.
    pub gps_attempts_remaining: Option<u32>,
    /// Whether a verification is running.
    pub verification_in_flight: bool,
    /// Conversation at the current waypoint.
    pub transcript: Vec<TranscriptEntry>,
    /// Elapsed quest time as `HH:MM:SS`.
    pub elapsed: String,
    /// `true` once the timer is frozen at completion.
    pub timer_locked: bool,
    /// Whether audio has been unlocked by a gesture.
    pub audio_unlocked: bool,
}

/// Formats a duration as `HH:MM:SS`. Negative durations show as zero;
/// hours are not wrapped.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Builds the view of `session` at `now`.
#[must_use]
pub fn quest_view(
    session: &QuestSession,
    definition: &QuestDefinition,
    now: DateTime<Utc>,
) -> QuestView {
    let catalog = &definition.catalog;
    let phase = session.phase();

    let shown = match phase {
        QuestPhase::AtWaypoint(n) | QuestPhase::Verifying(n) | QuestPhase::Celebrating(n) => {
            catalog.get(n)
        }
        _ => None,
    };
    let waypoint = shown.map(|waypoint| {
        let used = usize::try_from(session.hints_used(waypoint.id)).unwrap_or(usize::MAX);
        WaypointView {
            id: waypoint.id,
            name: waypoint.name.clone(),
            narration: waypoint.narration.clone(),
            scripture: waypoint.scripture.clone(),
            scripture_text: waypoint.scripture_text.clone(),
            revealed_hints: waypoint.hints.iter().take(used).cloned().collect(),
            total_hints: u32::try_from(waypoint.hints.len()).unwrap_or(u32::MAX),
            has_gps_target: waypoint.target.is_some(),
            backup_keyword: waypoint.backup_keyword.clone(),
            celebration: matches!(phase, QuestPhase::Celebrating(_))
                .then(|| waypoint.celebration_text()),
        }
    });

    let finale = matches!(phase, QuestPhase::AtFinale | QuestPhase::Completed).then(|| {
        FinaleView {
            name: catalog.finale.name.clone(),
            symbol: catalog.finale.symbol.clone(),
            narration: catalog.finale.narration.clone(),
            celebration: (phase == QuestPhase::Completed)
                .then(|| catalog.finale.celebration.clone()),
        }
    });

    QuestView {
        session_id: session.id,
        phase,
        team_name: session.team_name().to_owned(),
        current_waypoint: session.current_waypoint(),
        total_waypoints: catalog.len(),
        waypoint,
        finale,
        collected_symbols: session.collected_symbols().to_vec(),
        hints_used: session.total_hints_used(),
        hint_gate: session.hint_status(&definition.tuning, now),
        chat_gate: session.chat_status(&definition.tuning, now),
        gps_attempts_remaining: session.gps_attempts_remaining(&definition.tuning),
        verification_in_flight: session.pending().is_some_and(|ticket| ticket.in_flight),
        transcript: session.transcript().to_vec(),
        elapsed: format_elapsed(session.elapsed(now)),
        timer_locked: session.finale_completed_at().is_some(),
        audio_unlocked: session.audio_unlocked(),
    }
}

/// Retrieves the view of the current quest session.
pub async fn get_quest_view(services: &QuestServices) -> QuestView {
    let session = services.current_session().await;
    quest_view(&session, &services.definition, services.clock.now())
}
