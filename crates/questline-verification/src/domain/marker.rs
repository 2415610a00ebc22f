//! The trailing match-count marker the chat model appends to its replies.

use std::sync::LazyLock;

use regex::Regex;

static MATCH_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*MATCH:\s*(\d+)\s*-->").expect("match marker pattern is a valid regex")
});

/// Splits a raw model reply into display text and match count.
///
/// The count comes from the first `<!--MATCH:N-->` marker; every marker is
/// removed from the text. A reply without a marker counts as zero matches.
#[must_use]
pub fn extract_match_marker(raw: &str) -> (String, u32) {
    let count = MATCH_MARKER
        .captures(raw)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .unwrap_or(0);
    let text = MATCH_MARKER.replace_all(raw, "").trim().to_owned();
    (text, count)
}
