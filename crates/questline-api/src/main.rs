//! Questline API server entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use questline_ai::{LlmSettings, OpenAiCompatClient, TtsClient, TtsSettings};
use questline_api::build_router;
use questline_api::config::{AppConfig, load_quest};
use questline_api::error::AppError;
use questline_api::host::{HostPorts, HostSettings, HostedQuest};
use questline_api::state::{AppState, Speech};
use questline_core::clock::SystemClock;
use questline_core::rng::{DeterministicRng, SystemRng};
use questline_narration::VoiceSettings;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Questline API server");

    let config = AppConfig::from_env()?;
    let definition = load_quest(config.quest_file.as_deref())?;
    tracing::info!(
        waypoints = definition.catalog.len(),
        quest_file = ?config.quest_file,
        "quest loaded"
    );

    let mut llm = LlmSettings::new(
        config.llm_base_url.clone(),
        config.llm_model.clone(),
        config.service_timeout,
    );
    llm.api_key = config.llm_api_key.clone();
    let llm = Arc::new(OpenAiCompatClient::new(llm).map_err(|e| AppError::Client(e.to_string()))?);

    let speech = match &config.speech {
        Some(speech) => {
            let client = TtsClient::new(TtsSettings {
                base_url: speech.base_url.clone(),
                api_key: speech.api_key.clone(),
                timeout: config.service_timeout,
            })
            .map_err(|e| AppError::Client(e.to_string()))?;
            Some(Speech {
                synthesizer: Arc::new(client),
                voice: VoiceSettings {
                    voice_id: speech.voice_id.clone(),
                    ..VoiceSettings::default()
                },
            })
        }
        None => {
            tracing::warn!("TTS_API_KEY not set, /api/tts is disabled");
            None
        }
    };

    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(SystemRng::new()));
    let hosted = HostedQuest::open(
        definition.clone(),
        &HostSettings {
            data_dir: config.data_dir.clone(),
            audio_dir: config.audio_dir.clone(),
        },
        HostPorts {
            clock: Arc::new(SystemClock),
            rng: rng.clone(),
            chat: llm.clone(),
            vision: llm.clone(),
            speech: speech.clone(),
        },
    );
    let app_state = AppState::new(definition, llm.clone(), llm, speech, rng).with_quest(hosted);

    // TODO: Replace CorsLayer::permissive() with the deployed origin once it is fixed.
    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
