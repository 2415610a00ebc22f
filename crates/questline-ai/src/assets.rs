//! Pre-rendered narration clips served over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use questline_narration::{AssetSource, AudioClip, NarrationError};
use reqwest::StatusCode;
use tracing::debug;

use crate::http::{build_client, endpoint};

/// Fetches `{base}/{key}`; a 404 means the clip was never rendered.
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetSource {
    /// Creates a source for clips under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `NarrationError::Unavailable` if the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NarrationError> {
        let client =
            build_client(timeout).map_err(|e| NarrationError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch(&self, key: &str) -> Result<Option<AudioClip>, NarrationError> {
        let url = endpoint(&self.base_url, key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NarrationError::Unavailable(format!("{url}: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(key, "no pre-rendered clip");
                Ok(None)
            }
            status if status.is_success() => {
                let media_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("audio/mpeg")
                    .to_owned();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| NarrationError::Unavailable(format!("{url}: {e}")))?;
                if bytes.is_empty() {
                    return Ok(None);
                }
                Ok(Some(AudioClip {
                    bytes: bytes.to_vec().into(),
                    media_type,
                }))
            }
            status => Err(NarrationError::Unavailable(format!("{url}: status {status}"))),
        }
    }
}
