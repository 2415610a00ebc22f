//! Clarifying follow-up questions for partial matches.

use questline_core::rng::DeterministicRng;

/// Used when a waypoint has no authored follow-up prompts.
pub const DEFAULT_FOLLOW_UP: &str = "Tell me what you see around you!";

/// Picks one prompt uniformly at random. An index outside the pool falls
/// back to the first prompt.
pub fn pick_follow_up(prompts: &[String], rng: &mut dyn DeterministicRng) -> String {
    let Some(first) = prompts.first() else {
        return DEFAULT_FOLLOW_UP.to_owned();
    };
    prompts
        .get(rng.pick_index(prompts.len()))
        .unwrap_or(first)
        .clone()
}
