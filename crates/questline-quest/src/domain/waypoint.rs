//! Authored quest content and deployment tuning.
//!
//! Loaded once at startup from a YAML quest file and never mutated.

use std::collections::HashSet;
use std::time::Duration;

use questline_core::error::DomainError;
use questline_geo::Coordinate;
use questline_verification::{GpsAttemptPolicy, PhotoThresholds};
use serde::{Deserialize, Serialize};

/// Deployment tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestTuning {
    /// GPS acceptance radius at intermediate waypoints.
    pub waypoint_radius_meters: f64,
    /// GPS acceptance radius at home base.
    pub finale_radius_meters: f64,
    /// GPS checks allowed per intermediate waypoint.
    pub gps_attempt_cap: u32,
    /// How long to wait for a device position fix.
    pub geolocation_timeout_secs: u64,
    /// Matched identifiers needed for a description to advance.
    pub description_match_threshold: u32,
    /// Photo confidence needed to accept.
    pub photo_accept_confidence: u8,
    /// Photo confidence needed for a partial match.
    pub photo_partial_confidence: u8,
    /// Minutes after a waypoint is first shown before hints unlock.
    pub hint_unlock_minutes: u32,
    /// Minutes after a waypoint is first shown before chat opens.
    pub chat_unlock_minutes: u32,
    /// Facilitator passcode. `None` disables the override.
    pub override_passcode: Option<String>,
}

impl Default for QuestTuning {
    fn default() -> Self {
        Self {
            waypoint_radius_meters: 25.0,
            finale_radius_meters: 50.0,
            gps_attempt_cap: 5,
            geolocation_timeout_secs: 15,
            description_match_threshold: 2,
            photo_accept_confidence: 80,
            photo_partial_confidence: 50,
            hint_unlock_minutes: 15,
            chat_unlock_minutes: 0,
            override_passcode: None,
        }
    }
}

impl QuestTuning {
    /// Photo bands. Falls back to the defaults if the pair is unordered,
    /// which [`WaypointCatalog::from_yaml`] already rejects.
    #[must_use]
    pub fn photo_thresholds(&self) -> PhotoThresholds {
        PhotoThresholds::new(self.photo_accept_confidence, self.photo_partial_confidence)
            .unwrap_or_default()
    }

    /// GPS attempt policy for an intermediate waypoint.
    #[must_use]
    pub fn waypoint_gps_policy(&self) -> GpsAttemptPolicy {
        GpsAttemptPolicy::Limited(self.gps_attempt_cap)
    }

    /// Time budget for a position fix.
    #[must_use]
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    /// Hint gate delay.
    #[must_use]
    pub fn hint_delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.hint_unlock_minutes))
    }

    /// Chat gate delay.
    #[must_use]
    pub fn chat_delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.chat_unlock_minutes))
    }

    fn validate(&self) -> Result<(), DomainError> {
        PhotoThresholds::new(self.photo_accept_confidence, self.photo_partial_confidence)?;
        for (name, radius) in [
            ("waypoint_radius_meters", self.waypoint_radius_meters),
            ("finale_radius_meters", self.finale_radius_meters),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(DomainError::Validation(format!(
                    "{name} must be a positive number of metres"
                )));
            }
        }
        if self.description_match_threshold == 0 {
            return Err(DomainError::Validation(
                "description_match_threshold must be at least 1".to_owned(),
            ));
        }
        if self.gps_attempt_cap == 0 {
            return Err(DomainError::Validation(
                "gps_attempt_cap must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// One stage of the hunt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position in the quest, starting at 1.
    pub id: u32,
    /// Proof symbol recorded when the waypoint is verified.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Clue narration (markdown).
    pub narration: String,
    /// Scripture or reference citation.
    #[serde(default)]
    pub scripture: String,
    /// Full text of the reference.
    #[serde(default)]
    pub scripture_text: String,
    /// Hint levels, revealed one at a time.
    pub hints: Vec<String>,
    /// Where the participants should stand.
    #[serde(default)]
    pub target: Option<Coordinate>,
    /// Descriptive phrases used as ground truth for AI matching.
    #[serde(default)]
    pub visual_identifiers: Vec<String>,
    /// Clarifying questions for partial matches.
    pub follow_up_prompts: Vec<String>,
    /// Celebration narration (markdown). Defaults to a short cheer.
    #[serde(default)]
    pub celebration: Option<String>,
    /// One-word keyword shown as a backup when all else fails.
    #[serde(default)]
    pub backup_keyword: Option<String>,
}

impl Waypoint {
    /// Celebration narration, falling back to a generic cheer.
    #[must_use]
    pub fn celebration_text(&self) -> String {
        self.celebration
            .clone()
            .unwrap_or_else(|| format!("You found it! The {} is yours.", self.symbol))
    }
}

/// Home base: the terminal GPS check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finale {
    /// Display symbol of the finale.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Home-base location.
    pub target: Coordinate,
    /// Directions home (markdown).
    pub narration: String,
    /// Closing narration played on completion (markdown).
    pub celebration: String,
}

/// Ordered waypoints plus the finale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointCatalog {
    /// Welcome narration (markdown).
    #[serde(default)]
    pub intro: String,
    /// Waypoints in order, ids `1..=N`.
    pub waypoints: Vec<Waypoint>,
    /// Home base.
    pub finale: Finale,
}

/// Everything loaded from a quest file.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestDefinition {
    /// Deployment tuning.
    pub tuning: QuestTuning,
    /// Authored content.
    pub catalog: WaypointCatalog,
}

#[derive(Deserialize)]
struct QuestFile {
    #[serde(default)]
    tuning: QuestTuning,
    #[serde(flatten)]
    catalog: WaypointCatalog,
}

impl WaypointCatalog {
    /// Parses and validates a YAML quest file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the YAML is malformed, waypoint
    /// ids are not `1..=N` in order, symbols repeat, a waypoint lacks hints
    /// or follow-up prompts, or the tuning is inconsistent.
    pub fn from_yaml(yaml: &str) -> Result<QuestDefinition, DomainError> {
        let file: QuestFile = serde_yaml::from_str(yaml)
            .map_err(|e| DomainError::Validation(format!("invalid quest file: {e}")))?;
        file.tuning.validate()?;
        file.catalog.validate()?;
        Ok(QuestDefinition {
            tuning: file.tuning,
            catalog: file.catalog,
        })
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.waypoints.is_empty() {
            return Err(DomainError::Validation(
                "a quest needs at least one waypoint".to_owned(),
            ));
        }

        let mut symbols = HashSet::new();
        for (position, waypoint) in (1u32..).zip(&self.waypoints) {
            if waypoint.id != position {
                return Err(DomainError::Validation(format!(
                    "waypoint ids must run 1..=N in order; found {} at position {position}",
                    waypoint.id
                )));
            }
            if waypoint.symbol.trim().is_empty() || !symbols.insert(waypoint.symbol.as_str()) {
                return Err(DomainError::Validation(format!(
                    "waypoint {} needs a unique, non-empty symbol",
                    waypoint.id
                )));
            }
            if waypoint.hints.is_empty() {
                return Err(DomainError::Validation(format!(
                    "waypoint {} needs at least one hint",
                    waypoint.id
                )));
            }
            if waypoint.follow_up_prompts.is_empty() {
                return Err(DomainError::Validation(format!(
                    "waypoint {} needs at least one follow-up prompt",
                    waypoint.id
                )));
            }
        }
        Ok(())
    }

    /// Number of waypoints, excluding the finale.
    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.waypoints.len()).unwrap_or(u32::MAX)
    }

    /// Returns `true` if there are no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint index that denotes the finale (`N + 1`).
    #[must_use]
    pub fn finale_index(&self) -> u32 {
        self.len().saturating_add(1)
    }

    /// Looks up a waypoint by id.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Waypoint> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.waypoints.get(index)
    }

    /// Looks up a waypoint by id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown id.
    pub fn require(&self, id: u32) -> Result<&Waypoint, DomainError> {
        self.get(id)
            .ok_or_else(|| DomainError::NotFound(format!("waypoint {id}")))
    }
}
