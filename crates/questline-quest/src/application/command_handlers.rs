//! Command handlers for the Quest context.
//!
//! Each handler unlocks audio (every command originates from a gesture),
//! applies the command to the session through
//! [`QuestServices::transact`], and starts the narration the transition
//! calls for. Checks that await an external service run in three steps:
//! open the attempt, await the service with the session released, then
//! apply the outcome only if the attempt is still pending.

use questline_core::command::Command;
use questline_core::error::DomainError;
use questline_narration::NarrationUnit;
use questline_verification::{
    ChatReply, ChatRequest, ConfidenceBand, FOUND_IT_REPLY, Speaker, VerificationOutcome,
    VisionRequest, found_it_phrase, photo_request_phrase, pick_follow_up,
};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::query_handlers::{QuestView, quest_view};
use crate::application::services::QuestServices;
use crate::domain::aggregates::{
    HintReveal, QuestPhase, QuestSession, Resolution, VerificationTicket,
};
use crate::domain::commands::{
    AttemptOverride, CancelVerification, CheckGps, ContinueQuest, FoundIt, OverrideAction,
    PresentWaypoint, RevealHint, ResetQuest, SendMessage, StartQuest, SubmitPhoto,
};
use crate::domain::gate::GateStatus;

/// Shown when the chat service cannot be reached.
pub const CHAT_UNAVAILABLE_REPLY: &str =
    "I'm having trouble hearing you right now. Try again in a moment!";

/// A transition and the narration it started.
#[derive(Debug)]
pub struct Transition {
    /// The session after the command.
    pub view: QuestView,
    /// Background narration, if any was started.
    pub narration: Option<JoinHandle<()>>,
}

/// Result of a verification attempt.
#[derive(Debug)]
pub struct VerificationResult {
    /// What the strategy decided.
    pub outcome: VerificationOutcome,
    /// Where the outcome left the session.
    pub resolution: Resolution,
    /// The session after the outcome was applied.
    pub view: QuestView,
    /// Celebration narration, if the attempt was accepted.
    pub narration: Option<JoinHandle<()>>,
}

/// Result of a chat message.
#[derive(Debug)]
pub struct ChatResult {
    /// The guide's reply.
    pub reply: String,
    /// Clarifying question for a partial description.
    pub follow_up: Option<String>,
    /// Whether the UI should offer the camera.
    pub photo_prompt: bool,
    /// Whether the description verified the waypoint.
    pub advanced: bool,
    /// The session after the message.
    pub view: QuestView,
    /// Celebration narration, if the description verified the waypoint.
    pub narration: Option<JoinHandle<()>>,
}

/// Result of a discovery claim.
#[derive(Debug)]
pub struct ClaimResult {
    /// Prompt asking for a photo.
    pub reply: String,
    /// The pending claim.
    pub ticket: VerificationTicket,
    /// The session after the claim.
    pub view: QuestView,
}

/// Result of a hint reveal.
#[derive(Debug)]
pub struct HintResult {
    /// The hint shown.
    pub hint: HintReveal,
    /// The session after the reveal.
    pub view: QuestView,
}

/// Result of a passcode entry.
#[derive(Debug)]
pub struct OverrideResult {
    /// Whether the passcode matched.
    pub accepted: bool,
    /// The session after the attempt.
    pub view: QuestView,
    /// Celebration narration for a skipped waypoint.
    pub narration: Option<JoinHandle<()>>,
}

/// Unlocks audio output for commands that may start narration.
async fn unlock_audio(services: &QuestServices, command: &dyn Command) {
    if command.starts_narration() {
        services.narration.unlock().await;
    }
}

fn view_of(services: &QuestServices, session: &QuestSession) -> QuestView {
    quest_view(session, &services.definition, services.clock.now())
}

/// Stops whatever is playing and starts `unit`, if it has content.
fn narrate(services: &QuestServices, unit: NarrationUnit) -> Option<JoinHandle<()>> {
    services.narration.stop();
    services
        .narration_content(unit)
        .map(|content| services.narration.spawn_play(content))
}

fn narration_for(resolution: Resolution) -> Option<NarrationUnit> {
    match resolution {
        Resolution::Celebrating(n) => Some(NarrationUnit::Celebration(n)),
        Resolution::Completed => Some(NarrationUnit::Finale),
        Resolution::Retry => None,
    }
}

/// Handles the `StartQuest` command: names the party, starts the clock and
/// plays the welcome.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the quest has already started, or
/// `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_start_quest(
    command: &StartQuest,
    services: &QuestServices,
) -> Result<Transition, DomainError> {
    unlock_audio(services, command).await;
    let ((), session) = services
        .transact(|session, _, clock| {
            session.start(&command.team_name, command.correlation_id, clock)
        })
        .await?;
    info!(team_name = session.team_name(), "quest started");

    Ok(Transition {
        narration: narrate(services, NarrationUnit::Intro),
        view: view_of(services, &session),
    })
}

/// Handles the `PresentWaypoint` command: starts the waypoint's timers the
/// first time and plays its clue.
///
/// # Errors
///
/// Returns `DomainError::Validation` if no stop is on screen, or
/// `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_present_waypoint(
    command: &PresentWaypoint,
    services: &QuestServices,
) -> Result<Transition, DomainError> {
    unlock_audio(services, command).await;
    let (waypoint_id, session) = services
        .transact(|session, _, clock| session.present_waypoint(command.correlation_id, clock))
        .await?;

    Ok(Transition {
        narration: narrate(services, NarrationUnit::Clue(waypoint_id)),
        view: view_of(services, &session),
    })
}

/// Handles the `FoundIt` command: opens a claim and asks for a photo.
///
/// # Errors
///
/// Returns `DomainError::Validation` if there is nothing to verify or a
/// check is already running.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_found_it(
    command: &FoundIt,
    services: &QuestServices,
) -> Result<ClaimResult, DomainError> {
    unlock_audio(services, command).await;
    let (ticket, session) = services
        .transact(|session, _, clock| {
            session.begin_verification(Uuid::new_v4(), false, command.correlation_id, clock)
        })
        .await?;
    info!(waypoint_id = ticket.waypoint_id, "discovery claimed");

    Ok(ClaimResult {
        reply: FOUND_IT_REPLY.to_owned(),
        ticket,
        view: view_of(services, &session),
    })
}

/// Handles the `CheckGps` command: counts the attempt, takes a position fix
/// and compares it with the current target.
///
/// The geolocation await runs with the session released. An attempt that
/// is no longer pending when the fix arrives is discarded.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the stop has no GPS target, the
/// attempt cap is reached, a check is already running or the quest is
/// complete; `DomainError::StaleOutcome` if the attempt was superseded; or
/// `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_check_gps(
    command: &CheckGps,
    services: &QuestServices,
) -> Result<VerificationResult, DomainError> {
    unlock_audio(services, command).await;
    let ((ticket, target, radius), _) = services
        .transact(|session, definition, clock| {
            let (target, radius) = match session.phase() {
                QuestPhase::AtWaypoint(n) | QuestPhase::Verifying(n) => {
                    let waypoint = definition.catalog.require(n)?;
                    let target = waypoint.target.ok_or_else(|| {
                        DomainError::Validation(format!(
                            "waypoint {n} has no GPS target. Try a photo instead."
                        ))
                    })?;
                    (target, definition.tuning.waypoint_radius_meters)
                }
                QuestPhase::AtFinale => (
                    definition.catalog.finale.target,
                    definition.tuning.finale_radius_meters,
                ),
                QuestPhase::Completed => {
                    return Err(DomainError::Validation(
                        "the quest is already complete".to_owned(),
                    ));
                }
                QuestPhase::AwaitingStart | QuestPhase::Celebrating(_) => {
                    return Err(DomainError::Validation(
                        "there is nothing to verify right now".to_owned(),
                    ));
                }
            };
            let policy = session.gps_policy(&definition.tuning);
            session.record_gps_attempt(policy, command.correlation_id, clock)?;
            let ticket =
                session.begin_verification(Uuid::new_v4(), true, command.correlation_id, clock)?;
            Ok((ticket, target, radius))
        })
        .await?;

    let outcome = services
        .gps
        .verify(target, radius, services.geolocation.as_ref())
        .await;

    finish_verification(services, ticket, outcome, command.correlation_id).await
}

/// Handles the `SubmitPhoto` command: sends the photo for inspection and
/// applies the banded result.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty photo, outside a
/// waypoint, or while a check is already running;
/// `DomainError::StaleOutcome` if the attempt was superseded; or
/// `DomainError::Infrastructure` if persistence fails.
#[instrument(
    skip(services, command),
    fields(command = command.command_type(), correlation_id = %command.correlation_id, bytes = command.photo.len())
)]
pub async fn handle_submit_photo(
    command: &SubmitPhoto,
    services: &QuestServices,
) -> Result<VerificationResult, DomainError> {
    unlock_audio(services, command).await;
    if command.photo.is_empty() {
        return Err(DomainError::Validation("the photo is empty".to_owned()));
    }

    let ((ticket, request, prompts), _) = services
        .transact(|session, definition, clock| {
            let Some(n) = session.active_waypoint() else {
                return Err(DomainError::Validation(
                    "photos are only checked at a waypoint".to_owned(),
                ));
            };
            let waypoint = definition.catalog.require(n)?;
            let ticket =
                session.begin_verification(Uuid::new_v4(), true, command.correlation_id, clock)?;
            let request = VisionRequest {
                photo: command.photo.clone(),
                media_type: command.media_type.clone(),
                waypoint_id: n,
                waypoint_name: waypoint.name.clone(),
                visual_identifiers: waypoint.visual_identifiers.clone(),
                reference_images: command.reference_images.clone(),
            };
            Ok((ticket, request, waypoint.follow_up_prompts.clone()))
        })
        .await?;

    let mut outcome = services.photo.verify(request, services.vision.as_ref()).await;
    if outcome.band == Some(ConfidenceBand::Partial) {
        let follow_up = {
            let mut rng = services
                .rng
                .lock()
                .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
            pick_follow_up(&prompts, &mut *rng)
        };
        outcome = outcome.with_follow_up(Some(follow_up));
    }

    finish_verification(services, ticket, outcome, command.correlation_id).await
}

async fn finish_verification(
    services: &QuestServices,
    ticket: VerificationTicket,
    outcome: VerificationOutcome,
    correlation_id: Uuid,
) -> Result<VerificationResult, DomainError> {
    let result = services
        .transact(|session, definition, clock| {
            session.complete_verification(
                ticket,
                &outcome,
                &definition.catalog,
                correlation_id,
                clock,
            )
        })
        .await;

    let (resolution, session) = match result {
        Ok(applied) => applied,
        Err(error @ DomainError::StaleOutcome { .. }) => {
            info!(
                waypoint_id = ticket.waypoint_id,
                attempt_id = %ticket.attempt_id,
                kind = ?outcome.kind,
                "discarding stale verification outcome"
            );
            return Err(error);
        }
        Err(error) => return Err(error),
    };
    info!(
        waypoint_id = ticket.waypoint_id,
        method = ?outcome.method,
        kind = ?outcome.kind,
        ?resolution,
        "verification applied"
    );

    Ok(VerificationResult {
        narration: narration_for(resolution).and_then(|unit| narrate(services, unit)),
        view: view_of(services, &session),
        outcome,
        resolution,
    })
}

enum MessageStep {
    Claimed,
    Ask {
        waypoint_id: u32,
        request: ChatRequest,
        prompts: Vec<String>,
    },
}

/// Handles the `SendMessage` command.
///
/// A "found it" phrase opens a claim and asks for a photo without calling
/// the chat service. Anything else goes to the chat service; a description
/// matching enough visual identifiers verifies the waypoint.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty message, outside a
/// waypoint, or while the chat gate is closed;
/// `DomainError::StaleOutcome` if the party moved on while the guide was
/// answering; or `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_send_message(
    command: &SendMessage,
    services: &QuestServices,
) -> Result<ChatResult, DomainError> {
    unlock_audio(services, command).await;
    let message = command.message.trim();
    if message.is_empty() {
        return Err(DomainError::Validation("the message is empty".to_owned()));
    }

    let (step, session) = services
        .transact(|session, definition, clock| {
            let Some(n) = session.active_waypoint() else {
                return Err(DomainError::Validation(
                    "chat is only available at a waypoint".to_owned(),
                ));
            };
            if let GateStatus::Locked { remaining_secs } =
                session.chat_status(&definition.tuning, clock.now())
            {
                return Err(DomainError::Validation(format!(
                    "chat opens in {}:{:02}",
                    remaining_secs / 60,
                    remaining_secs % 60
                )));
            }

            let waypoint = definition.catalog.require(n)?;
            let transcript = session.transcript().to_vec();
            session.append_exchange(Speaker::Participant, message, command.correlation_id, clock)?;

            let claim_open = !session.pending().is_some_and(|ticket| ticket.in_flight);
            if found_it_phrase(message) && claim_open {
                session.begin_verification(Uuid::new_v4(), false, command.correlation_id, clock)?;
                session.append_exchange(
                    Speaker::Guide,
                    FOUND_IT_REPLY,
                    command.correlation_id,
                    clock,
                )?;
                return Ok(MessageStep::Claimed);
            }

            let hints_used = session.hints_used(n);
            let revealed_hint = usize::try_from(hints_used)
                .ok()
                .and_then(|level| level.checked_sub(1))
                .and_then(|index| waypoint.hints.get(index))
                .cloned();
            let request = ChatRequest {
                message: message.to_owned(),
                waypoint_id: n,
                waypoint_name: waypoint.name.clone(),
                visual_identifiers: waypoint.visual_identifiers.clone(),
                revealed_hint,
                collected_symbols: session.collected_symbols().to_vec(),
                hints_used,
                team_name: session.team_name().to_owned(),
                transcript,
            };
            Ok(MessageStep::Ask {
                waypoint_id: n,
                request,
                prompts: waypoint.follow_up_prompts.clone(),
            })
        })
        .await?;

    let (waypoint_id, request, prompts) = match step {
        MessageStep::Claimed => {
            info!("discovery claimed in chat");
            return Ok(ChatResult {
                reply: FOUND_IT_REPLY.to_owned(),
                follow_up: None,
                photo_prompt: true,
                advanced: false,
                view: view_of(services, &session),
                narration: None,
            });
        }
        MessageStep::Ask {
            waypoint_id,
            request,
            prompts,
        } => (waypoint_id, request, prompts),
    };

    let reply = match services.chat.chat(request).await {
        Ok(reply) => reply,
        Err(error) => {
            warn!(waypoint_id, error = %error, "chat service failed");
            return Ok(ChatResult {
                reply: CHAT_UNAVAILABLE_REPLY.to_owned(),
                follow_up: None,
                photo_prompt: photo_request_phrase(message),
                advanced: false,
                view: view_of(services, &session),
                narration: None,
            });
        }
    };

    apply_chat_reply(services, command, waypoint_id, &reply, &prompts).await
}

async fn apply_chat_reply(
    services: &QuestServices,
    command: &SendMessage,
    waypoint_id: u32,
    reply: &ChatReply,
    prompts: &[String],
) -> Result<ChatResult, DomainError> {
    let verdict = {
        let mut rng = services
            .rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        services.description.evaluate(reply, prompts, &mut *rng)
    };
    let photo_prompt = verdict.photo_prompt || photo_request_phrase(&command.message);

    let (resolution, session) = services
        .transact(|session, definition, clock| {
            if session.active_waypoint() != Some(waypoint_id) {
                return Err(DomainError::StaleOutcome {
                    waypoint_id,
                    attempt_id: command.correlation_id,
                });
            }
            session.append_exchange(Speaker::Guide, &verdict.reply, command.correlation_id, clock)?;
            if !verdict.auto_advance {
                return Ok(Resolution::Retry);
            }
            // A running GPS or photo check owns the attempt; let it finish.
            if session.pending().is_some_and(|ticket| ticket.in_flight) {
                info!(waypoint_id, "description matched while a check is running");
                return Ok(Resolution::Retry);
            }
            let ticket =
                session.begin_verification(Uuid::new_v4(), true, command.correlation_id, clock)?;
            session.complete_verification(
                ticket,
                &verdict.outcome(),
                &definition.catalog,
                command.correlation_id,
                clock,
            )
        })
        .await
        .inspect_err(|error| {
            if matches!(error, DomainError::StaleOutcome { .. }) {
                info!(waypoint_id, "discarding chat reply for a waypoint left behind");
            }
        })?;

    let advanced = matches!(resolution, Resolution::Celebrating(_));
    if advanced {
        info!(waypoint_id, "description verified the waypoint");
    }

    Ok(ChatResult {
        reply: verdict.reply,
        follow_up: verdict.follow_up,
        photo_prompt,
        advanced,
        narration: narration_for(resolution).and_then(|unit| narrate(services, unit)),
        view: view_of(services, &session),
    })
}

/// Handles the `CancelVerification` command.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_cancel_verification(
    command: &CancelVerification,
    services: &QuestServices,
) -> Result<Transition, DomainError> {
    unlock_audio(services, command).await;
    let ((), session) = services
        .transact(|session, _, clock| {
            session.cancel_verification(command.correlation_id, clock);
            Ok(())
        })
        .await?;

    Ok(Transition {
        view: view_of(services, &session),
        narration: None,
    })
}

/// Handles the `RevealHint` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside a waypoint or while the hint
/// gate is closed, or `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_reveal_hint(
    command: &RevealHint,
    services: &QuestServices,
) -> Result<HintResult, DomainError> {
    unlock_audio(services, command).await;
    let (hint, session) = services
        .transact(|session, definition, clock| {
            session.reveal_hint(
                &definition.catalog,
                &definition.tuning,
                command.correlation_id,
                clock,
            )
        })
        .await?;
    info!(
        waypoint_id = hint.waypoint_id,
        level = hint.level,
        newly_revealed = hint.newly_revealed,
        "hint shown"
    );

    Ok(HintResult {
        hint,
        view: view_of(services, &session),
    })
}

/// Handles the `AttemptOverride` command. A wrong passcode is not an error.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside a waypoint, or
/// `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id, action = ?command.action))]
pub async fn handle_attempt_override(
    command: &AttemptOverride,
    services: &QuestServices,
) -> Result<OverrideResult, DomainError> {
    unlock_audio(services, command).await;
    let ((accepted, waypoint_id), session) = services
        .transact(|session, definition, clock| {
            let waypoint_id = session.active_waypoint();
            let accepted = session.attempt_override(
                &command.passcode,
                command.action,
                definition,
                command.correlation_id,
                clock,
            )?;
            Ok((accepted, waypoint_id))
        })
        .await?;

    let narration = match (accepted, command.action, waypoint_id) {
        (true, OverrideAction::SkipWaypoint, Some(n)) => {
            narrate(services, NarrationUnit::Celebration(n))
        }
        _ => None,
    };

    Ok(OverrideResult {
        accepted,
        view: view_of(services, &session),
        narration,
    })
}

/// Handles the `ContinueQuest` command: leaves the celebration and plays
/// the next clue (or the directions home).
///
/// # Errors
///
/// Returns `DomainError::Validation` outside a celebration,
/// `DomainError::InvariantViolation` if the index is inconsistent, or
/// `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_continue(
    command: &ContinueQuest,
    services: &QuestServices,
) -> Result<Transition, DomainError> {
    unlock_audio(services, command).await;
    let (phase, session) = services
        .transact(|session, definition, clock| {
            session.continue_quest(&definition.catalog, command.correlation_id, clock)
        })
        .await?;

    let unit = match phase {
        QuestPhase::AtWaypoint(n) => Some(NarrationUnit::Clue(n)),
        QuestPhase::AtFinale => Some(NarrationUnit::Clue(
            services.definition.catalog.finale_index(),
        )),
        _ => None,
    };

    Ok(Transition {
        narration: unit.and_then(|unit| narrate(services, unit)),
        view: view_of(services, &session),
    })
}

/// Handles the `ResetQuest` command: clears the session and silences any
/// narration.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if persistence fails.
#[instrument(skip(services, command), fields(command = command.command_type(), correlation_id = %command.correlation_id))]
pub async fn handle_reset(
    command: &ResetQuest,
    services: &QuestServices,
) -> Result<Transition, DomainError> {
    services.narration.stop();
    let ((), session) = services
        .transact(|session, _, clock| {
            session.reset(command.correlation_id, clock);
            Ok(())
        })
        .await?;
    warn!(session_id = %session.id, "quest reset");

    Ok(Transition {
        view: view_of(services, &session),
        narration: None,
    })
}
