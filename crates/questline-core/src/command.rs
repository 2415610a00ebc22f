//! Command abstractions.
//!
//! A command is one participant or facilitator gesture. Its correlation id
//! is stamped on every event and log line the gesture causes.

use uuid::Uuid;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted name used in logs, e.g. `quest.check_gps`.
    fn command_type(&self) -> &'static str;

    /// Correlation ID shared by everything this command causes.
    fn correlation_id(&self) -> Uuid;

    /// Whether handling the command may start narration, and so must first
    /// unlock audio output. Audio can only be unlocked from a gesture.
    fn starts_narration(&self) -> bool {
        true
    }
}
