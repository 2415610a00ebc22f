//! Questline — AI and speech adapters.
//!
//! `reqwest` clients for the services the quest consumes: an
//! OpenAI-compatible chat-completions endpoint (conversation and photo
//! inspection), a streaming text-to-speech endpoint, and an HTTP host of
//! pre-rendered narration clips.

pub mod assets;
pub mod http;
pub mod openai_compat;
pub mod prompts;
pub mod tts;

pub use assets::HttpAssetSource;
pub use openai_compat::{
    CHAT_FALLBACK_REPLY, LlmSettings, OpenAiCompatClient, VISION_FALLBACK_REPLY,
};
pub use tts::{TtsClient, TtsSettings};
