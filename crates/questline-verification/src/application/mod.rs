//! Verification strategies.

pub mod description;
pub mod follow_up;
pub mod gps;
pub mod phrases;
pub mod photo;
