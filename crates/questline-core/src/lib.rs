//! Questline Core — shared domain abstractions.
//!
//! This crate defines the traits and types every bounded context depends on:
//! time, randomness, commands, events, aggregates, persistence seams and the
//! retry policy used when calling external services. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;
pub mod retry;
pub mod rng;
pub mod snapshot;
