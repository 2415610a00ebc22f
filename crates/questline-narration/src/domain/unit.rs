//! Narration units and their speakable content.

use std::fmt;

use pulldown_cmark::{Event, Parser, TagEnd};
use serde::{Deserialize, Serialize};

/// One narrated moment of the quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "waypoint", rename_all = "snake_case")]
pub enum NarrationUnit {
    /// Welcome before the first waypoint.
    Intro,
    /// Clue for waypoint `n`.
    Clue(u32),
    /// Celebration after waypoint `n` is verified.
    Celebration(u32),
    /// Closing narration at home base.
    Finale,
}

impl NarrationUnit {
    /// Stable file name of the pre-rendered asset for this unit.
    #[must_use]
    pub fn asset_key(self) -> String {
        match self {
            Self::Intro => "intro.mp3".to_owned(),
            Self::Clue(n) => format!("clue-{n}.mp3"),
            Self::Celebration(n) => format!("celebration-{n}.mp3"),
            Self::Finale => "finale.mp3".to_owned(),
        }
    }
}

impl fmt::Display for NarrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intro => f.write_str("intro"),
            Self::Clue(n) => write!(f, "clue-{n}"),
            Self::Celebration(n) => write!(f, "celebration-{n}"),
            Self::Finale => f.write_str("finale"),
        }
    }
}

/// Speakable text for a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationContent {
    /// Which moment this is.
    pub unit: NarrationUnit,
    /// Plain text, one block per line.
    pub text: String,
}

impl NarrationContent {
    /// Wraps text that is already plain.
    #[must_use]
    pub fn plain(unit: NarrationUnit, text: impl Into<String>) -> Self {
        Self {
            unit,
            text: text.into(),
        }
    }

    /// Flattens authored markdown to speakable text.
    ///
    /// Emphasis and links keep their text, raw HTML (including comments) is
    /// dropped, and each block becomes one line.
    #[must_use]
    pub fn from_markdown(unit: NarrationUnit, markdown: &str) -> Self {
        let mut flat = String::with_capacity(markdown.len());
        for event in Parser::new(markdown) {
            match event {
                Event::Text(text) | Event::Code(text) => flat.push_str(&text),
                Event::SoftBreak | Event::HardBreak => flat.push(' '),
                Event::End(
                    TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
                ) => flat.push('\n'),
                _ => {}
            }
        }

        let text = flat
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Self { unit, text }
    }

    /// Returns `true` if there is nothing to say.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
