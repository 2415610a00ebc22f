//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use questline_quest::domain::waypoint::{QuestDefinition, WaypointCatalog};

use crate::error::AppError;

/// The quest bundled with the server, used when `QUEST_FILE` is unset.
pub const SAMPLE_QUEST: &str = include_str!("../../../content/sample-quest.yaml");

/// Model used when `LLM_MODEL` is unset.
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";

/// Speech endpoint used when `TTS_BASE_URL` is unset.
pub const DEFAULT_TTS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Directory for the session snapshot and audit trail when `QUEST_DATA_DIR`
/// is unset.
pub const DEFAULT_DATA_DIR: &str = "data";

const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 60;

/// Speech synthesis settings; present only when `TTS_API_KEY` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Base URL of the speech service.
    pub base_url: String,
    /// API key sent as `xi-api-key`.
    pub api_key: String,
    /// Voice to render with.
    pub voice_id: String,
}

/// Everything the server reads at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Bind address.
    pub addr: SocketAddr,
    /// Quest file; the bundled sample quest is used when unset.
    pub quest_file: Option<PathBuf>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub llm_base_url: String,
    /// Model name.
    pub llm_model: String,
    /// Bearer token for the model endpoint.
    pub llm_api_key: Option<String>,
    /// Speech synthesis, if configured.
    pub speech: Option<SpeechConfig>,
    /// Time budget for one call to an external service.
    pub service_timeout: Duration,
    /// Where the hosted session is stored.
    pub data_dir: PathBuf,
    /// Pre-rendered narration clips.
    pub audio_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let llm_base_url = var("LLM_BASE_URL")
            .ok_or_else(|| AppError::Config("LLM_BASE_URL environment variable must be set".into()))?;

        let service_timeout = match var("SERVICE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "SERVICE_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECS),
        };

        let speech = match var("TTS_API_KEY") {
            Some(api_key) => Some(SpeechConfig {
                base_url: var("TTS_BASE_URL").unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string()),
                api_key,
                voice_id: var("TTS_VOICE_ID").ok_or_else(|| {
                    AppError::Config("TTS_VOICE_ID must be set when TTS_API_KEY is set".into())
                })?,
            }),
            None => None,
        };

        Ok(Self {
            addr,
            quest_file: var("QUEST_FILE").map(PathBuf::from),
            llm_base_url,
            llm_model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_api_key: var("LLM_API_KEY"),
            speech,
            service_timeout,
            data_dir: var("QUEST_DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            audio_dir: var("AUDIO_DIR").map(PathBuf::from),
        })
    }
}

/// Loads and validates the quest at `path`, or the bundled sample quest.
///
/// # Errors
///
/// Returns `AppError::Config` if the file cannot be read and
/// `AppError::Quest` if its content is invalid.
pub fn load_quest(path: Option<&Path>) -> Result<QuestDefinition, AppError> {
    let yaml = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read quest file {}: {e}", path.display()))
        })?,
        None => SAMPLE_QUEST.to_owned(),
    };
    Ok(WaypointCatalog::from_yaml(&yaml)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_minimal_environment_uses_defaults() {
        let config = config_from(&[("LLM_BASE_URL", "http://llm.local")]).unwrap();

        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(config.service_timeout, Duration::from_secs(60));
        assert!(config.speech.is_none());
        assert!(config.quest_file.is_none());
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(config.audio_dir.is_none());
    }

    #[test]
    fn test_missing_llm_base_url_is_a_config_error() {
        let result = config_from(&[("PORT", "8080")]);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("LLM_BASE_URL")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = config_from(&[("LLM_BASE_URL", "http://llm.local"), ("PORT", "99999")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_speech_needs_a_voice() {
        let result = config_from(&[("LLM_BASE_URL", "http://llm.local"), ("TTS_API_KEY", "k")]);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("TTS_VOICE_ID")));
    }

    #[test]
    fn test_full_environment() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("QUEST_FILE", "/srv/quest.yaml"),
            ("LLM_BASE_URL", "http://llm.local"),
            ("LLM_MODEL", "vision-large"),
            ("LLM_API_KEY", "secret"),
            ("TTS_API_KEY", "xi"),
            ("TTS_VOICE_ID", "guide"),
            ("SERVICE_TIMEOUT_SECS", "20"),
            ("QUEST_DATA_DIR", "/var/lib/questline"),
            ("AUDIO_DIR", "/srv/audio"),
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.quest_file, Some(PathBuf::from("/srv/quest.yaml")));
        assert_eq!(config.llm_api_key.as_deref(), Some("secret"));
        assert_eq!(config.service_timeout, Duration::from_secs(20));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/questline"));
        assert_eq!(config.audio_dir, Some(PathBuf::from("/srv/audio")));
        let speech = config.speech.unwrap();
        assert_eq!(speech.base_url, DEFAULT_TTS_BASE_URL);
        assert_eq!(speech.voice_id, "guide");
    }

    #[test]
    fn test_bundled_quest_loads() {
        let definition = load_quest(None).unwrap();

        assert_eq!(definition.catalog.len(), 8);
        assert!(definition.tuning.override_passcode.is_some());
    }

    #[test]
    fn test_missing_quest_file_is_a_config_error() {
        let result = load_quest(Some(Path::new("/nonexistent/quest.yaml")));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = config_from(&[
            ("LLM_BASE_URL", "http://llm.local"),
            ("SERVICE_TIMEOUT_SECS", "0"),
        ]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
