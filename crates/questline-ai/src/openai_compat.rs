//! Chat and vision over an OpenAI-compatible `chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use questline_core::retry::RetryPolicy;
use questline_verification::{
    ChatReply, ChatRequest, ChatService, ServiceError, Speaker, VisionReport, VisionRequest,
    VisionService, extract_match_marker, photo_request_phrase,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::http::{build_client, endpoint, ensure_success, transport_error};
use crate::prompts::{guide_system_prompt, verification_system_prompt};

/// Reply used when the model returns no text.
pub const CHAT_FALLBACK_REPLY: &str = "I couldn't quite understand that. Can you try again?";

/// Reply used when the model's photo assessment cannot be read.
pub const VISION_FALLBACK_REPLY: &str =
    "Hmm, I'm having trouble seeing that photo. Can you try taking another one?";

/// Match count at which the service reports its own unlock opinion.
const ADVISORY_UNLOCK_MATCHES: u32 = 2;

const CHAT_MAX_TOKENS: u32 = 200;
const VISION_MAX_TOKENS: u32 = 500;

/// Connection settings for the language model.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL, e.g. `https://llm.example.com`.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Bearer token, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Timeout and retry budget per call.
    pub retry: RetryPolicy,
}

impl LlmSettings {
    /// Settings with a single attempt bounded by `timeout`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            retry: RetryPolicy::single_attempt(timeout),
        }
    }
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

/// The JSON object the vision prompt asks for. Older prompt revisions used
/// camel-cased names, which are still accepted.
#[derive(Deserialize)]
struct VisionAssessment {
    #[serde(default)]
    matches: Vec<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default, alias = "isCorrect")]
    is_correct: bool,
    #[serde(default, alias = "granddaddyResponse", alias = "reply")]
    response: String,
}

/// Client for an OpenAI-compatible completions API.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl OpenAiCompatClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: LlmSettings) -> Result<Self, ServiceError> {
        let client = build_client(settings.retry.attempt_timeout)?;
        Ok(Self { client, settings })
    }

    async fn complete(&self, operation: &str, body: &Value) -> Result<String, ServiceError> {
        let url = endpoint(&self.settings.base_url, "v1/chat/completions");
        let url = url.as_str();
        let timeout = self.settings.retry.attempt_timeout;

        self.settings
            .retry
            .run(operation, |_| async move {
                let mut request = self.client.post(url).json(body);
                if let Some(key) = &self.settings.api_key {
                    request = request.bearer_auth(key);
                }
                let response = request
                    .send()
                    .await
                    .map_err(|e| transport_error(&e, timeout))?;
                let response = ensure_success(response).await?;
                let parsed: CompletionResponse = response
                    .json()
                    .await
                    .map_err(|e| ServiceError::Malformed(e.to_string()))?;
                Ok(parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .unwrap_or_default())
            })
            .await
    }
}

/// Builds the chat `messages` array: system prompt, prior turns, new message.
fn chat_messages(request: &ChatRequest) -> Vec<Value> {
    let mut messages = vec![json!({"role": "system", "content": guide_system_prompt(request)})];
    messages.extend(request.transcript.iter().map(|entry| {
        let role = match entry.speaker {
            Speaker::Participant => "user",
            Speaker::Guide => "assistant",
        };
        json!({"role": role, "content": entry.text})
    }));
    messages.push(json!({"role": "user", "content": request.message}));
    messages
}

fn data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// Builds the multimodal user content: reference photos, then the new photo.
fn vision_content(request: &VisionRequest) -> Vec<Value> {
    let mut parts = Vec::with_capacity(request.reference_images.len() * 2 + 3);
    for (index, image) in request.reference_images.iter().enumerate() {
        parts.push(json!({
            "type": "text",
            "text": format!("Reference image {} for waypoint {}:", index + 1, request.waypoint_id),
        }));
        parts.push(json!({
            "type": "image_url",
            "image_url": {"url": data_url("image/jpeg", image)},
        }));
    }
    parts.push(json!({"type": "text", "text": "Here is the photo the party just took:"}));
    parts.push(json!({
        "type": "image_url",
        "image_url": {"url": data_url(&request.media_type, &request.photo)},
    }));
    parts.push(json!({
        "type": "text",
        "text": "Analyze this photo and respond with JSON as specified.",
    }));
    parts
}

/// Extracts the assessment from model output: the span from the first `{`
/// to the last `}` is parsed as JSON.
fn parse_assessment(text: &str) -> Option<VisionReport> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let assessment: VisionAssessment = serde_json::from_str(&text[start..=end]).ok()?;
    // Clamped to 0..=100, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let confidence = assessment.confidence.clamp(0.0, 100.0).round() as u8;
    Some(VisionReport {
        matched_identifiers: assessment.matches,
        confidence,
        accepted: assessment.is_correct,
        reply: assessment.response,
    })
}

fn fallback_report() -> VisionReport {
    VisionReport {
        matched_identifiers: Vec::new(),
        confidence: 0,
        accepted: false,
        reply: VISION_FALLBACK_REPLY.to_owned(),
    }
}

#[async_trait]
impl ChatService for OpenAiCompatClient {
    #[instrument(skip(self, request), fields(waypoint_id = request.waypoint_id))]
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ServiceError> {
        let body = json!({
            "model": self.settings.model,
            "max_tokens": CHAT_MAX_TOKENS,
            "messages": chat_messages(&request),
        });
        let raw = self.complete("chat completion", &body).await?;

        let (text, match_count) = extract_match_marker(&raw);
        let reply = if text.is_empty() {
            CHAT_FALLBACK_REPLY.to_owned()
        } else {
            text
        };
        debug!(match_count, "chat reply received");

        Ok(ChatReply {
            reply,
            match_count,
            auto_unlock: match_count >= ADVISORY_UNLOCK_MATCHES,
            photo_prompt: photo_request_phrase(&request.message),
        })
    }
}

#[async_trait]
impl VisionService for OpenAiCompatClient {
    #[instrument(skip(self, request), fields(waypoint_id = request.waypoint_id, bytes = request.photo.len()))]
    async fn inspect(&self, request: VisionRequest) -> Result<VisionReport, ServiceError> {
        let body = json!({
            "model": self.settings.model,
            "max_tokens": VISION_MAX_TOKENS,
            "messages": [
                {"role": "system", "content": verification_system_prompt(&request)},
                {"role": "user", "content": vision_content(&request)},
            ],
        });
        let raw = self.complete("photo inspection", &body).await?;

        Ok(parse_assessment(&raw).unwrap_or_else(|| {
            warn!("vision output had no readable assessment");
            fallback_report()
        }))
    }
}

#[cfg(test)]
mod tests {
    use questline_verification::TranscriptEntry;

    use super::*;

    #[test]
    fn test_parse_assessment_finds_embedded_json() {
        let text = "Sure! ```json\n{\"matches\": [\"bench\"], \"confidence\": 72.6, \"is_correct\": false, \"response\": \"Close!\"}\n```";

        let report = parse_assessment(text).unwrap();

        assert_eq!(report.matched_identifiers, vec!["bench".to_owned()]);
        assert_eq!(report.confidence, 73);
        assert!(!report.accepted);
        assert_eq!(report.reply, "Close!");
    }

    #[test]
    fn test_parse_assessment_accepts_camel_case_names() {
        let text = r#"{"matches": [], "confidence": 95, "isCorrect": true, "granddaddyResponse": "Yes!"}"#;

        let report = parse_assessment(text).unwrap();

        assert!(report.accepted);
        assert_eq!(report.reply, "Yes!");
    }

    #[test]
    fn test_parse_assessment_clamps_confidence() {
        let report = parse_assessment(r#"{"confidence": 140}"#).unwrap();

        assert_eq!(report.confidence, 100);
    }

    #[test]
    fn test_parse_assessment_rejects_prose() {
        assert!(parse_assessment("I can't tell, sorry").is_none());
        assert!(parse_assessment("} backwards {").is_none());
    }

    #[test]
    fn test_chat_messages_map_speakers_to_roles() {
        let request = ChatRequest {
            message: "and now?".to_owned(),
            waypoint_id: 2,
            waypoint_name: "The Lamp".to_owned(),
            visual_identifiers: vec!["lamp post".to_owned()],
            revealed_hint: None,
            collected_symbols: vec!["STAR".to_owned()],
            hints_used: 0,
            team_name: "Wise Ones".to_owned(),
            transcript: vec![
                TranscriptEntry {
                    speaker: Speaker::Participant,
                    text: "hello".to_owned(),
                },
                TranscriptEntry {
                    speaker: Speaker::Guide,
                    text: "hi there".to_owned(),
                },
            ],
        };

        let messages = chat_messages(&request);

        let roles: Vec<&str> = messages
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[3]["content"], "and now?");
    }

    #[test]
    fn test_vision_content_puts_references_before_photo() {
        let request = VisionRequest {
            photo: b"new".to_vec(),
            media_type: "image/png".to_owned(),
            waypoint_id: 1,
            waypoint_name: "The Star".to_owned(),
            visual_identifiers: Vec::new(),
            reference_images: vec![b"ref".to_vec()],
        };

        let parts = vision_content(&request);

        assert_eq!(parts.len(), 5);
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,cmVm");
        assert_eq!(parts[3]["image_url"]["url"], "data:image/png;base64,bmV3");
    }
}
