//! Provider chain and the playback orchestrator.

pub mod orchestrator;
pub mod providers;
