//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use questline_core::clock::SystemClock;
use questline_core::rng::DeterministicRng;
use questline_narration::VoiceSettings;
use questline_quest::domain::waypoint::QuestDefinition;
use questline_test_support::{
    MockRng, ScriptedChatService, ScriptedSynthesizer, ScriptedVisionService,
};
use tower::ServiceExt;

use questline_api::build_router;
use questline_api::config::load_quest;
use questline_api::host::{HostPorts, HostSettings, HostedQuest};
use questline_api::state::{AppState, Speech};

/// The bundled sample quest.
pub fn sample_quest() -> QuestDefinition {
    load_quest(None).unwrap()
}

/// Doubles wired into the app. Keep the `Arc`s to inspect calls afterwards.
pub struct Fakes {
    pub chat: Arc<ScriptedChatService>,
    pub vision: Arc<ScriptedVisionService>,
    pub speech: Option<Arc<ScriptedSynthesizer>>,
}

impl Fakes {
    /// Chat and vision with empty scripts and no speech.
    pub fn new() -> Self {
        Self {
            chat: Arc::new(ScriptedChatService::default()),
            vision: Arc::new(ScriptedVisionService::default()),
            speech: None,
        }
    }

    pub fn with_chat(mut self, chat: ScriptedChatService) -> Self {
        self.chat = Arc::new(chat);
        self
    }

    pub fn with_vision(mut self, vision: ScriptedVisionService) -> Self {
        self.vision = Arc::new(vision);
        self
    }

    pub fn with_speech(mut self, synthesizer: ScriptedSynthesizer) -> Self {
        self.speech = Some(Arc::new(synthesizer));
        self
    }
}

/// Build the full app router over the sample quest with a deterministic
/// RNG. Uses the same route structure as `main.rs`.
pub fn build_test_app(fakes: &Fakes) -> Router {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    let speech = fakes.speech.clone().map(|synthesizer| Speech {
        synthesizer,
        voice: VoiceSettings {
            voice_id: "guide-voice".to_owned(),
            ..VoiceSettings::default()
        },
    });
    let state = AppState::new(
        sample_quest(),
        fakes.chat.clone(),
        fakes.vision.clone(),
        speech,
        rng,
    );
    build_router(state)
}

/// Build the app with a hosted quest stored in `data_dir`. Two apps built
/// on the same directory behave like one server before and after a
/// restart.
pub fn build_hosted_app(fakes: &Fakes, data_dir: &Path) -> Router {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    let hosted = HostedQuest::open(
        sample_quest(),
        &HostSettings {
            data_dir: data_dir.to_path_buf(),
            audio_dir: None,
        },
        HostPorts {
            clock: Arc::new(SystemClock),
            rng: rng.clone(),
            chat: fakes.chat.clone(),
            vision: fakes.vision.clone(),
            speech: None,
        },
    );
    let state = AppState::new(
        sample_quest(),
        fakes.chat.clone(),
        fakes.vision.clone(),
        None,
        rng,
    )
    .with_quest(hosted);
    build_router(state)
}

/// Send a POST request with a JSON body and return the raw response.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, Option<String>, Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, bytes)
}

/// Send a POST request with a JSON body and return the JSON response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = post_raw(app, uri, body).await;
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the raw response.
pub async fn get_raw(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, bytes)
}

/// Send a GET request and return the JSON response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = get_raw(app, uri).await;
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    (status, json)
}
