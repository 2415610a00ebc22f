//! Shared test doubles for the Questline engine.

mod audio;
mod clock;
mod repository;
mod rng;
mod services;
mod snapshot;

pub use audio::{Performance, RecordingAudioOutput, ScriptedSynthesizer, StaticAssetSource};
pub use clock::{FixedClock, SteppingClock};
pub use repository::{FailingEventRepository, RecordingEventRepository};
pub use rng::{MockRng, SequenceRng};
pub use services::{ScriptedChatService, ScriptedGeolocation, ScriptedVisionService};
pub use snapshot::{FailingSnapshotStore, InMemorySnapshotStore};
