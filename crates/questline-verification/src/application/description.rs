//! Conversational description strategy.
//!
//! The chat service counts how many of the waypoint's visual identifiers the
//! participants' message matches. Only that count drives the decision, and
//! it is never shown to the participants.

use questline_core::rng::DeterministicRng;
use tracing::debug;

use crate::application::follow_up::pick_follow_up;
use crate::domain::contracts::ChatReply;
use crate::domain::marker::extract_match_marker;
use crate::domain::outcome::VerificationOutcome;

/// Decision taken on one chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionVerdict {
    /// The description matched enough identifiers to advance.
    pub auto_advance: bool,
    /// Text to show the participants.
    pub reply: String,
    /// Clarifying question when some, but not enough, identifiers matched.
    pub follow_up: Option<String>,
    /// The participants asked to show a photo.
    pub photo_prompt: bool,
}

impl DescriptionVerdict {
    /// The verdict as a verification outcome.
    #[must_use]
    pub fn outcome(&self) -> VerificationOutcome {
        VerificationOutcome::from_description(self.auto_advance, self.reply.clone())
            .with_follow_up(self.follow_up.clone())
    }
}

/// Threshold-based evaluation of chat replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionStrategy {
    threshold: u32,
}

impl Default for DescriptionStrategy {
    fn default() -> Self {
        Self { threshold: 2 }
    }
}

impl DescriptionStrategy {
    /// Creates a strategy that advances at `threshold` matches (minimum 1).
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    /// Matches required to advance.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Evaluates a chat reply against the threshold.
    pub fn evaluate(
        &self,
        reply: &ChatReply,
        follow_up_prompts: &[String],
        rng: &mut dyn DeterministicRng,
    ) -> DescriptionVerdict {
        let auto_advance = reply.match_count >= self.threshold;
        let follow_up = (reply.match_count > 0 && !auto_advance)
            .then(|| pick_follow_up(follow_up_prompts, rng));

        if reply.auto_unlock != auto_advance {
            debug!(
                service_auto_unlock = reply.auto_unlock,
                auto_advance, "chat service unlock opinion overridden by threshold"
            );
        }

        // A marker that slipped through must not leak the count.
        let (text, _) = extract_match_marker(&reply.reply);

        DescriptionVerdict {
            auto_advance,
            reply: text,
            follow_up,
            photo_prompt: reply.photo_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use questline_test_support::{MockRng, SequenceRng};

    use super::*;
    use crate::domain::outcome::OutcomeKind;

    fn reply(match_count: u32) -> ChatReply {
        ChatReply {
            reply: "Ooh, tell me more!".to_owned(),
            match_count,
            auto_unlock: match_count >= 2,
            photo_prompt: false,
        }
    }

    fn prompts() -> Vec<String> {
        vec![
            "What colour is it?".to_owned(),
            "Is anything sparkly nearby?".to_owned(),
        ]
    }

    #[test]
    fn test_one_match_does_not_advance_and_asks_follow_up() {
        // Arrange
        let strategy = DescriptionStrategy::new(2);
        let mut rng = SequenceRng::new(vec![1]);

        // Act
        let verdict = strategy.evaluate(&reply(1), &prompts(), &mut rng);

        // Assert
        assert!(!verdict.auto_advance);
        assert_eq!(verdict.follow_up.as_deref(), Some("Is anything sparkly nearby?"));
        assert_eq!(verdict.outcome().kind, OutcomeKind::RejectedLowConfidence);
    }

    #[test]
    fn test_two_matches_advance() {
        let strategy = DescriptionStrategy::new(2);
        let mut rng = MockRng;

        let verdict = strategy.evaluate(&reply(2), &prompts(), &mut rng);

        assert!(verdict.auto_advance);
        assert_eq!(verdict.follow_up, None);
        assert!(verdict.outcome().is_accepted());
    }

    #[test]
    fn test_zero_matches_is_just_conversation() {
        let strategy = DescriptionStrategy::default();
        let mut rng = MockRng;

        let verdict = strategy.evaluate(&reply(0), &prompts(), &mut rng);

        assert!(!verdict.auto_advance);
        assert_eq!(verdict.follow_up, None);
    }

    #[test]
    fn test_threshold_overrides_service_opinion() {
        let strategy = DescriptionStrategy::new(3);
        let mut rng = MockRng;

        let verdict = strategy.evaluate(&reply(2), &prompts(), &mut rng);

        assert!(!verdict.auto_advance);
    }

    #[test]
    fn test_leftover_marker_is_stripped_from_reply() {
        let strategy = DescriptionStrategy::default();
        let mut rng = MockRng;
        let mut raw = reply(1);
        raw.reply = "Nice! <!--MATCH:1-->".to_owned();

        let verdict = strategy.evaluate(&raw, &prompts(), &mut rng);

        assert_eq!(verdict.reply, "Nice!");
        assert!(!verdict.reply.contains('1'));
    }

    #[test]
    fn test_zero_threshold_is_raised_to_one() {
        assert_eq!(DescriptionStrategy::new(0).threshold(), 1);
    }
}
