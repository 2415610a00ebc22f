//! Narration domain model.

pub mod contracts;
pub mod errors;
pub mod unit;
