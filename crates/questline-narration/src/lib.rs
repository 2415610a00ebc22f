//! Questline — Narration.
//!
//! Plays exactly one piece of spoken narration at a time. Content is
//! resolved through an ordered chain of providers (pre-rendered asset,
//! on-demand synthesis, on-device speech); every failure falls through to
//! the next provider and total failure degrades to silence.

pub mod application;
pub mod domain;

pub use application::orchestrator::{DEFAULT_STAGE_TIMEOUT, NarrationOrchestrator};
pub use application::providers::{
    DeviceSpeechProvider, NarrationProvider, PrerenderedAssetProvider, Rendition,
    SynthesisProvider,
};
pub use domain::contracts::{
    AssetSource, AudioClip, AudioOutput, SpeechSynthesizer, SynthesisRequest, VoiceSettings,
};
pub use domain::errors::NarrationError;
pub use domain::unit::{NarrationContent, NarrationUnit};
