//! Questline — Quest Progression.
//!
//! Owns the quest session: the ordered waypoints, collected proof symbols,
//! the hint and chat gates, and the transitions between them. Verification
//! outcomes drive the transitions, and the transitions drive narration.

pub mod application;
pub mod domain;
