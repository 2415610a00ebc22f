//! The quest session hosted by the server.
//!
//! The browser is the party's device but the session lives here, on disk,
//! so a reload or a server restart picks up where the party left off. Two
//! adapters stand in for the device: [`NarrationRelay`] is the audio
//! channel the browser polls, and [`ReportedPosition`] hands the quest the
//! fix the browser sent with its GPS check.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use questline_core::clock::Clock;
use questline_core::rng::DeterministicRng;
use questline_geo::Coordinate;
use questline_narration::{
    AudioClip, AudioOutput, DeviceSpeechProvider, NarrationError, NarrationOrchestrator,
    NarrationProvider, PrerenderedAssetProvider, SynthesisProvider,
};
use questline_quest::application::services::{QuestPorts, QuestServices};
use questline_quest::domain::waypoint::QuestDefinition;
use questline_store::{DirectoryAssetSource, FileSnapshotStore, JsonLinesEventRepository};
use questline_verification::{ChatService, GeolocationError, GeolocationProvider, VisionService};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::state::Speech;

/// File name of the audit trail inside the data directory.
pub const AUDIT_FILE: &str = "audit.jsonl";

/// What the browser should play now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueBody {
    /// A rendered clip, base64 encoded.
    Clip { media_type: String, audio: String },
    /// Text for the device's own voice.
    Speech { text: String },
}

/// One narration cue. A higher `sequence` replaces anything older.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cue {
    pub sequence: u64,
    #[serde(flatten)]
    pub body: CueBody,
}

/// Audio output that publishes the current cue instead of playing it.
///
/// Playback on the server side ends as soon as the cue is published; the
/// browser owns the actual speaker.
#[derive(Debug, Default)]
pub struct NarrationRelay {
    cue: Mutex<Option<Cue>>,
    next_sequence: AtomicU64,
}

impl NarrationRelay {
    /// Creates an idle relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cue to play, if narration is active.
    pub fn current(&self) -> Option<Cue> {
        self.cue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, body: CueBody) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(sequence, "narration cue published");
        *self.cue.lock().unwrap_or_else(PoisonError::into_inner) = Some(Cue { sequence, body });
    }
}

#[async_trait]
impl AudioOutput for NarrationRelay {
    async fn resume(&self) -> Result<(), NarrationError> {
        Ok(())
    }

    async fn play_clip(&self, clip: AudioClip) -> Result<(), NarrationError> {
        self.publish(CueBody::Clip {
            media_type: clip.media_type,
            audio: STANDARD.encode(&*clip.bytes),
        });
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), NarrationError> {
        self.publish(CueBody::Speech {
            text: text.to_owned(),
        });
        Ok(())
    }

    fn halt(&self) {
        self.cue.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

/// Geolocation fed by the browser: each GPS check carries the fix (or the
/// device's failure), which is consumed by exactly one check.
#[derive(Debug, Default)]
pub struct ReportedPosition {
    fix: Mutex<Option<Result<Coordinate, GeolocationError>>>,
}

impl ReportedPosition {
    /// Creates a provider with no fix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the fix for the next check.
    pub fn report(&self, fix: Result<Coordinate, GeolocationError>) {
        *self.fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(fix);
    }
}

#[async_trait]
impl GeolocationProvider for ReportedPosition {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        self.fix
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or(Err(GeolocationError::PositionUnavailable))
    }
}

/// Where the hosted session keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Snapshots and the audit trail.
    pub data_dir: PathBuf,
    /// Pre-rendered narration clips, if any were rendered.
    pub audio_dir: Option<PathBuf>,
}

/// Collaborators the hosted session shares with the proxy routes.
pub struct HostPorts {
    pub clock: Arc<dyn Clock>,
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    pub chat: Arc<dyn ChatService>,
    pub vision: Arc<dyn VisionService>,
    pub speech: Option<Speech>,
}

/// The hosted session and its device adapters.
#[derive(Clone)]
pub struct HostedQuest {
    pub services: Arc<QuestServices>,
    pub relay: Arc<NarrationRelay>,
    pub position: Arc<ReportedPosition>,
    /// Held from reporting a fix until its check has taken it.
    pub gps_turn: Arc<AsyncMutex<()>>,
}

impl HostedQuest {
    /// Wires the session over file storage in `settings.data_dir`.
    ///
    /// Narration tries pre-rendered clips, then synthesis (when speech is
    /// configured), then the device's voice.
    #[must_use]
    pub fn open(definition: QuestDefinition, settings: &HostSettings, ports: HostPorts) -> Self {
        let relay = Arc::new(NarrationRelay::new());
        let position = Arc::new(ReportedPosition::new());

        let mut providers: Vec<Arc<dyn NarrationProvider>> = Vec::new();
        if let Some(audio_dir) = &settings.audio_dir {
            providers.push(Arc::new(PrerenderedAssetProvider::new(Arc::new(
                DirectoryAssetSource::new(audio_dir.clone()),
            ))));
        }
        if let Some(speech) = ports.speech {
            providers.push(Arc::new(SynthesisProvider::new(
                speech.synthesizer,
                speech.voice,
            )));
        }
        providers.push(Arc::new(DeviceSpeechProvider));
        let narration = Arc::new(NarrationOrchestrator::new(relay.clone(), providers));

        info!(
            data_dir = %settings.data_dir.display(),
            audio_dir = ?settings.audio_dir,
            "hosting quest session"
        );
        let services = QuestServices::new(
            definition,
            QuestPorts {
                clock: ports.clock,
                rng: ports.rng,
                snapshots: Arc::new(FileSnapshotStore::new(settings.data_dir.clone())),
                audit: Arc::new(JsonLinesEventRepository::new(
                    settings.data_dir.join(AUDIT_FILE),
                )),
                narration,
                chat: ports.chat,
                vision: ports.vision,
                geolocation: position.clone(),
            },
        );

        Self {
            services: Arc::new(services),
            relay,
            position,
            gps_turn: Arc::new(AsyncMutex::new(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relay_publishes_latest_cue_and_halt_clears_it() {
        // Arrange
        let relay = NarrationRelay::new();

        // Act
        relay.speak("Welcome, seekers!").await.unwrap();
        relay.play_clip(AudioClip::mpeg(b"ID3".to_vec())).await.unwrap();

        // Assert
        let cue = relay.current().unwrap();
        assert_eq!(cue.sequence, 2);
        assert_eq!(
            cue.body,
            CueBody::Clip {
                media_type: "audio/mpeg".to_owned(),
                audio: "SUQz".to_owned(),
            }
        );

        relay.halt();
        assert!(relay.current().is_none());
    }

    #[tokio::test]
    async fn test_reported_fix_is_used_once() {
        let position = ReportedPosition::new();
        let fix = Coordinate::new(33.6247, -78.9573).unwrap();
        position.report(Ok(fix));

        assert_eq!(position.current_position().await, Ok(fix));
        assert_eq!(
            position.current_position().await,
            Err(GeolocationError::PositionUnavailable)
        );
    }

    #[tokio::test]
    async fn test_reported_failure_reaches_the_check() {
        let position = ReportedPosition::new();

        position.report(Err(GeolocationError::PermissionDenied));

        assert_eq!(
            position.current_position().await,
            Err(GeolocationError::PermissionDenied)
        );
    }

    #[test]
    fn test_cue_serializes_flat_with_kind_tag() {
        let cue = Cue {
            sequence: 4,
            body: CueBody::Speech {
                text: "Head home.".to_owned(),
            },
        };

        let json = serde_json::to_value(&cue).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"sequence": 4, "kind": "speech", "text": "Head home."})
        );
    }
}
