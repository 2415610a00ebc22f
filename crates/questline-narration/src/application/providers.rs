//! The narration fallback chain.
//!
//! Every provider has the same shape: given content, produce something the
//! audio output can perform, or fail so the orchestrator moves on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use questline_core::retry::RetryPolicy;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::contracts::{
    AssetSource, AudioClip, SpeechSynthesizer, SynthesisRequest, VoiceSettings,
};
use crate::domain::errors::NarrationError;
use crate::domain::unit::NarrationContent;

/// What a provider hands to the audio output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendition {
    /// Encoded audio.
    Clip(AudioClip),
    /// Text for the device's built-in voice.
    DeviceSpeech(String),
}

/// One stage of the fallback chain.
#[async_trait]
pub trait NarrationProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Produces a rendition of `content`.
    async fn render(&self, content: &NarrationContent) -> Result<Rendition, NarrationError>;
}

/// Fast path: clips rendered ahead of time.
pub struct PrerenderedAssetProvider {
    source: Arc<dyn AssetSource>,
}

impl PrerenderedAssetProvider {
    /// Creates a provider reading from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl NarrationProvider for PrerenderedAssetProvider {
    fn name(&self) -> &'static str {
        "prerendered"
    }

    async fn render(&self, content: &NarrationContent) -> Result<Rendition, NarrationError> {
        let key = content.unit.asset_key();
        self.source
            .fetch(&key)
            .await?
            .map(Rendition::Clip)
            .ok_or_else(|| NarrationError::Unavailable(format!("no pre-rendered asset {key}")))
    }
}

/// Slow path: on-demand synthesis with bounded retry.
///
/// Successful clips are cached by a SHA-256 of voice, model and text, so
/// replaying a unit does not call the service again.
pub struct SynthesisProvider {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voice: VoiceSettings,
    retry: RetryPolicy,
    cache: Mutex<HashMap<String, AudioClip>>,
}

impl SynthesisProvider {
    /// Creates a provider using the default retry policy.
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, voice: VoiceSettings) -> Self {
        Self {
            synthesizer,
            voice,
            retry: RetryPolicy::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn cache_key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.voice.voice_id.as_bytes());
        hasher.update([0]);
        hasher.update(self.voice.model_id.as_bytes());
        hasher.update([0]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn cached(&self, key: &str) -> Option<AudioClip> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    fn remember(&self, key: String, clip: AudioClip) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, clip);
        }
    }
}

#[async_trait]
impl NarrationProvider for SynthesisProvider {
    fn name(&self) -> &'static str {
        "synthesis"
    }

    async fn render(&self, content: &NarrationContent) -> Result<Rendition, NarrationError> {
        if content.is_empty() {
            return Err(NarrationError::Unavailable("nothing to synthesise".to_owned()));
        }

        let key = self.cache_key(&content.text);
        if let Some(clip) = self.cached(&key) {
            debug!(unit = %content.unit, "synthesis cache hit");
            return Ok(Rendition::Clip(clip));
        }

        let request = SynthesisRequest {
            text: content.text.clone(),
            voice: self.voice.clone(),
        };
        let clip = self
            .retry
            .run("speech synthesis", |_| self.synthesizer.synthesize(&request))
            .await?;

        self.remember(key, clip.clone());
        Ok(Rendition::Clip(clip))
    }
}

/// Last resort: the device's built-in voice. Available whenever there is
/// text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceSpeechProvider;

#[async_trait]
impl NarrationProvider for DeviceSpeechProvider {
    fn name(&self) -> &'static str {
        "device-speech"
    }

    async fn render(&self, content: &NarrationContent) -> Result<Rendition, NarrationError> {
        if content.is_empty() {
            return Err(NarrationError::Unavailable("nothing to speak".to_owned()));
        }
        Ok(Rendition::DeviceSpeech(content.text.clone()))
    }
}
