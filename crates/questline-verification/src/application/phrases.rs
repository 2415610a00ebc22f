//! Intent detection on free-text messages.

use std::sync::LazyLock;

use regex::Regex;

/// Reply sent when the participants announce they found the spot.
pub const FOUND_IT_REPLY: &str = "Great! Let me see - take a photo so I can check!";

static FOUND_IT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)found it|we['’]re here|i['’]m here|we found|i found|here it is")
        .expect("found-it pattern is a valid regex")
});

static PHOTO_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)photo|picture|snap|camera|show me|let me see")
        .expect("photo-request pattern is a valid regex")
});

/// Returns `true` if the message announces a discovery ("we found it").
#[must_use]
pub fn found_it_phrase(message: &str) -> bool {
    FOUND_IT.is_match(message)
}

/// Returns `true` if the message asks to show or take a photo.
#[must_use]
pub fn photo_request_phrase(message: &str) -> bool {
    PHOTO_REQUEST.is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_it_variants() {
        for message in [
            "We FOUND IT!!",
            "we're here",
            "I’m here by the bench",
            "i found the star",
            "here it is",
        ] {
            assert!(found_it_phrase(message), "{message}");
        }
    }

    #[test]
    fn test_plain_description_is_not_found_it() {
        assert!(!found_it_phrase("I see a yellow star and a bench"));
    }

    #[test]
    fn test_photo_request_variants() {
        assert!(photo_request_phrase("can I send a picture?"));
        assert!(photo_request_phrase("Let me see the camera"));
        assert!(!photo_request_phrase("what does the hint mean"));
    }
}
