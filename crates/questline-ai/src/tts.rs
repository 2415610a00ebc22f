//! Streaming text-to-speech client.

use std::time::Duration;

use async_trait::async_trait;
use questline_narration::{AudioClip, NarrationError, SpeechSynthesizer, SynthesisRequest};
use questline_verification::ServiceError;
use serde_json::json;
use tracing::{debug, instrument};

use crate::http::{build_client, endpoint, ensure_success, transport_error};

/// Connection settings for the speech service.
#[derive(Debug, Clone)]
pub struct TtsSettings {
    /// Base URL, e.g. `https://api.elevenlabs.io`.
    pub base_url: String,
    /// Value of the `xi-api-key` header.
    pub api_key: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

/// Client for `POST {base}/v1/text-to-speech/{voice_id}/stream`.
///
/// Makes one request per call; retries and the per-attempt timeout belong
/// to the narration provider that drives it.
#[derive(Debug, Clone)]
pub struct TtsClient {
    client: reqwest::Client,
    settings: TtsSettings,
}

impl TtsClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: TtsSettings) -> Result<Self, ServiceError> {
        let client = build_client(settings.timeout)?;
        Ok(Self { client, settings })
    }

    /// Renders `request` to MP3 bytes.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceError` if the request fails, the service answers
    /// with a non-success status, or the body is empty.
    #[instrument(skip(self, request), fields(voice_id = %request.voice.voice_id, chars = request.text.len()))]
    pub async fn render(&self, request: &SynthesisRequest) -> Result<AudioClip, ServiceError> {
        if request.voice.voice_id.is_empty() {
            return Err(ServiceError::Transport("no voice id configured".to_owned()));
        }
        let url = endpoint(
            &self.settings.base_url,
            &format!("v1/text-to-speech/{}/stream", request.voice.voice_id),
        );
        let body = json!({
            "text": request.text,
            "model_id": request.voice.model_id,
            "voice_settings": {
                "stability": request.voice.stability,
                "similarity_boost": request.voice.similarity_boost,
            },
        });

        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.settings.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.settings.timeout))?;
        let bytes = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(&e, self.settings.timeout))?;
        if bytes.is_empty() {
            return Err(ServiceError::Malformed("empty audio body".to_owned()));
        }

        debug!(bytes = bytes.len(), "speech rendered");
        Ok(AudioClip::mpeg(bytes.to_vec()))
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip, NarrationError> {
        self.render(request)
            .await
            .map_err(|e| NarrationError::Synthesis(e.to_string()))
    }
}
