//! Consumed audio, asset and speech-synthesis contracts.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::NarrationError;

/// Encoded audio ready for the output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Encoded bytes, shared so cached clips clone cheaply.
    pub bytes: Arc<[u8]>,
    /// MIME type, e.g. `audio/mpeg`.
    pub media_type: String,
}

impl AudioClip {
    /// An MP3 clip.
    #[must_use]
    pub fn mpeg(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: "audio/mpeg".to_owned(),
        }
    }
}

/// Voice parameters passed to the speech service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Service voice identifier.
    pub voice_id: String,
    /// Service model identifier.
    pub model_id: String,
    /// Stability, 0.0..=1.0.
    pub stability: f32,
    /// Similarity boost, 0.0..=1.0.
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: String::new(),
            model_id: "eleven_turbo_v2_5".to_owned(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

/// One synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Text to speak.
    pub text: String,
    /// Voice to speak it with.
    pub voice: VoiceSettings,
}

/// The single audio channel of the device.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Resumes the suspended audio context. Requires a user gesture on
    /// mobile browsers.
    async fn resume(&self) -> Result<(), NarrationError>;

    /// Plays a clip; resolves when it ends.
    async fn play_clip(&self, clip: AudioClip) -> Result<(), NarrationError>;

    /// Speaks text with the device's own voice; resolves when done.
    async fn speak(&self, text: &str) -> Result<(), NarrationError>;

    /// Silences the channel immediately. Safe when idle.
    fn halt(&self);
}

/// Store of pre-rendered narration clips keyed by file name.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Returns the clip for `key`, or `None` if it was never rendered.
    async fn fetch(&self, key: &str) -> Result<Option<AudioClip>, NarrationError>;
}

/// External text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders text to audio.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip, NarrationError>;
}
