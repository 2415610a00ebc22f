//! Shared application state.

use std::sync::{Arc, Mutex};

use questline_core::rng::DeterministicRng;
use questline_narration::{SpeechSynthesizer, VoiceSettings};
use questline_quest::domain::waypoint::QuestDefinition;
use questline_verification::{ChatService, DescriptionStrategy, PhotoStrategy, VisionService};

use crate::host::HostedQuest;

/// Speech synthesis and the voice it renders with.
#[derive(Clone)]
pub struct Speech {
    /// The speech service.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Voice parameters sent with every request.
    pub voice: VoiceSettings,
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The loaded quest.
    pub definition: Arc<QuestDefinition>,
    /// Conversational guide.
    pub chat: Arc<dyn ChatService>,
    /// Photo inspection.
    pub vision: Arc<dyn VisionService>,
    /// Speech synthesis, if configured.
    pub speech: Option<Speech>,
    /// Randomness for follow-up selection.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Photo bands from the quest tuning.
    pub photo: PhotoStrategy,
    /// Description threshold from the quest tuning.
    pub description: DescriptionStrategy,
    /// The quest session this server hosts, if any.
    pub quest: Option<HostedQuest>,
}

impl AppState {
    /// Create new application state. The verification strategies are
    /// configured from the quest's tuning.
    #[must_use]
    pub fn new(
        definition: QuestDefinition,
        chat: Arc<dyn ChatService>,
        vision: Arc<dyn VisionService>,
        speech: Option<Speech>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    ) -> Self {
        let photo = PhotoStrategy::new(definition.tuning.photo_thresholds());
        let description = DescriptionStrategy::new(definition.tuning.description_match_threshold);
        Self {
            definition: Arc::new(definition),
            chat,
            vision,
            speech,
            rng,
            photo,
            description,
            quest: None,
        }
    }

    /// Hosts `quest` behind the `/api/quest` routes.
    #[must_use]
    pub fn with_quest(mut self, quest: HostedQuest) -> Self {
        self.quest = Some(quest);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("waypoints", &self.definition.catalog.len())
            .field("speech", &self.speech.is_some())
            .field("hosting", &self.quest.is_some())
            .field("photo", &self.photo)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
