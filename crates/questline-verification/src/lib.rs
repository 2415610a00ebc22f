//! Questline — Location Verification.
//!
//! Decides whether a claimed discovery is accepted. Three interchangeable
//! strategies (GPS proximity, conversational description, photo) each
//! produce a [`VerificationOutcome`]; the quest state machine never needs
//! to know which one ran. The chat, vision and geolocation services are
//! consumed through the traits in [`domain::contracts`].

pub mod application;
pub mod domain;

pub use application::description::{DescriptionStrategy, DescriptionVerdict};
pub use application::follow_up::{DEFAULT_FOLLOW_UP, pick_follow_up};
pub use application::gps::GpsStrategy;
pub use application::phrases::{FOUND_IT_REPLY, found_it_phrase, photo_request_phrase};
pub use application::photo::{PHOTO_RETRY_MESSAGE, PhotoStrategy};
pub use domain::contracts::{
    ChatReply, ChatRequest, ChatService, GeolocationProvider, Speaker, TranscriptEntry,
    VisionReport, VisionRequest, VisionService,
};
pub use domain::errors::{GeolocationError, ServiceError};
pub use domain::marker::extract_match_marker;
pub use domain::outcome::{ConfidenceBand, OutcomeKind, VerificationMethod, VerificationOutcome};
pub use domain::policy::{GpsAttemptPolicy, PhotoThresholds};
