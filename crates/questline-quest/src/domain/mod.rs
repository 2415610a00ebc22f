//! Quest domain model.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod gate;
pub mod waypoint;
