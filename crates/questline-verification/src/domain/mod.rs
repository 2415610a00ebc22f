//! Verification domain model: outcomes, policies and service contracts.

pub mod contracts;
pub mod errors;
pub mod marker;
pub mod outcome;
pub mod policy;
