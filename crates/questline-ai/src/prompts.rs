//! System prompts for the guide persona.
//!
//! The prompts carry the waypoint's visual identifiers so the model can
//! score descriptions and photos. Only the numeric result (match count or
//! confidence) drives the quest; the prose is passed through as-is.

use std::fmt::Write as _;

use questline_verification::{ChatRequest, VisionRequest};

/// Numbered list of identifiers, one per line.
fn numbered(items: &[String]) -> String {
    let mut out = String::new();
    for (index, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {item}", index + 1);
    }
    out
}

/// Prompt for one conversational turn at a waypoint.
#[must_use]
pub fn guide_system_prompt(request: &ChatRequest) -> String {
    let symbols = if request.collected_symbols.is_empty() {
        "none yet".to_owned()
    } else {
        request.collected_symbols.join(" ")
    };
    let hint = match &request.revealed_hint {
        Some(hint) => format!("The party has revealed this hint, so you may expand on it: {hint}"),
        None => "The party has not revealed a hint. Stay playful and vague about the location."
            .to_owned(),
    };

    format!(
        "You are the guide of a treasure hunt, speaking to a team called \"{team}\". \
Replies are read aloud: keep them warm, encouraging and under 30 words.

RULES:
- Never name the place or the items they are looking for. Guide, don't solve.
- If they say they found it, ask them to take a photo.
- If a description is vague, ask for specific details (colours, signs, what is nearby).
- Answer off-topic questions briefly, then steer back to the hunt.

CURRENT STATE:
- Waypoint {id}: {name}
- Symbols collected: {symbols}
- Hints used here: {hints_used}
- {hint}

VISUAL IDENTIFIERS (secret, use only for matching):
{identifiers}
DESCRIPTION MATCHING:
Count how many identifiers the latest message describes, accepting obvious synonyms.
End every reply with this marker on its own line, where N is that count:
<!--MATCH:N-->",
        team = request.team_name,
        id = request.waypoint_id,
        name = request.waypoint_name,
        hints_used = request.hints_used,
        identifiers = numbered(&request.visual_identifiers),
    )
}

/// Prompt for inspecting one photo.
#[must_use]
pub fn verification_system_prompt(request: &VisionRequest) -> String {
    format!(
        "You are the guide of a treasure hunt, checking whether a photo shows waypoint {id}: {name}.

VISUAL IDENTIFIERS TO LOOK FOR:
{identifiers}
Respond with JSON only:
{{
  \"matches\": [\"identifiers visible in the photo\"],
  \"confidence\": 0-100,
  \"is_correct\": true or false,
  \"response\": \"a short, encouraging reply to the party\"
}}

CONFIDENCE:
- 80-100: definitely the right spot
- 50-79: might be right, ask a clarifying question in the response
- 0-49: wrong place, encourage them to keep looking",
        id = request.waypoint_id,
        name = request.waypoint_name,
        identifiers = numbered(&request.visual_identifiers),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_request() -> ChatRequest {
        ChatRequest {
            message: "we see a star".to_owned(),
            waypoint_id: 1,
            waypoint_name: "The Star".to_owned(),
            visual_identifiers: vec!["yellow star".to_owned(), "bench".to_owned()],
            revealed_hint: None,
            collected_symbols: Vec::new(),
            hints_used: 0,
            team_name: "Wise Ones".to_owned(),
            transcript: Vec::new(),
        }
    }

    #[test]
    fn test_guide_prompt_lists_identifiers_and_marker() {
        let prompt = guide_system_prompt(&chat_request());

        assert!(prompt.contains("1. yellow star\n2. bench\n"));
        assert!(prompt.contains("<!--MATCH:N-->"));
        assert!(prompt.contains("\"Wise Ones\""));
        assert!(prompt.contains("Symbols collected: none yet"));
    }

    #[test]
    fn test_guide_prompt_includes_revealed_hint() {
        let mut request = chat_request();
        request.revealed_hint = Some("Look up.".to_owned());
        request.collected_symbols = vec!["STAR".to_owned(), "LAMP".to_owned()];

        let prompt = guide_system_prompt(&request);

        assert!(prompt.contains("Look up."));
        assert!(prompt.contains("Symbols collected: STAR LAMP"));
    }
}
