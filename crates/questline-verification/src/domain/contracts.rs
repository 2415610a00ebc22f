//! Request/response contracts of the consumed services.

use async_trait::async_trait;
use questline_geo::Coordinate;
use serde::{Deserialize, Serialize};

use super::errors::{GeolocationError, ServiceError};

/// Who said a line of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// Someone in the party.
    Participant,
    /// The narrator persona answering them.
    Guide,
}

/// One line of the per-waypoint conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who said it.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
}

/// A free-text message to the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The participants' message.
    pub message: String,
    /// Current waypoint id.
    pub waypoint_id: u32,
    /// Display name of the current waypoint.
    pub waypoint_name: String,
    /// Ground truth for description matching. Never shown to participants.
    pub visual_identifiers: Vec<String>,
    /// Hint text the participants have already revealed, if any.
    pub revealed_hint: Option<String>,
    /// Proof symbols collected so far.
    pub collected_symbols: Vec<String>,
    /// Hints used at the current waypoint.
    pub hints_used: u32,
    /// Party name.
    pub team_name: String,
    /// Conversation so far at this waypoint.
    pub transcript: Vec<TranscriptEntry>,
}

/// The chat service's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Reply text, with any match marker already removed.
    pub reply: String,
    /// Number of visual identifiers the message matched.
    pub match_count: u32,
    /// The service's own opinion on unlocking. Advisory only.
    pub auto_unlock: bool,
    /// Whether the participants asked to show a photo.
    pub photo_prompt: bool,
}

/// A photo submitted for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionRequest {
    /// Raw image bytes.
    pub photo: Vec<u8>,
    /// MIME type of `photo`.
    pub media_type: String,
    /// Waypoint the photo claims to show.
    pub waypoint_id: u32,
    /// Display name of that waypoint.
    pub waypoint_name: String,
    /// Identifiers the vision service should look for.
    pub visual_identifiers: Vec<String>,
    /// Optional reference photos of the real spot.
    pub reference_images: Vec<Vec<u8>>,
}

/// The vision service's assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionReport {
    /// Identifiers the service believes are visible.
    pub matched_identifiers: Vec<String>,
    /// Confidence 0..=100.
    pub confidence: u8,
    /// The service's own verdict. Advisory only; bands decide.
    pub accepted: bool,
    /// Reply text to show the participants.
    pub reply: String,
}

/// Conversational language model.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Sends one message and returns the reply.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ServiceError>;
}

/// Image understanding model.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Inspects a photo against the waypoint's visual identifiers.
    async fn inspect(&self, request: VisionRequest) -> Result<VisionReport, ServiceError>;
}

/// Source of the device's current position.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Returns a fresh position fix.
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}
