//! Commands for the Quest context.

use questline_core::command::Command;
use uuid::Uuid;

/// First gesture: names the party and starts the quest.
#[derive(Debug, Clone)]
pub struct StartQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Party name; blank means the default.
    pub team_name: String,
}

impl Command for StartQuest {
    fn command_type(&self) -> &'static str {
        "quest.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Shows the current waypoint and plays its clue.
#[derive(Debug, Clone)]
pub struct PresentWaypoint {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for PresentWaypoint {
    fn command_type(&self) -> &'static str {
        "quest.present_waypoint"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// The participants claim they have found the spot.
#[derive(Debug, Clone)]
pub struct FoundIt {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for FoundIt {
    fn command_type(&self) -> &'static str {
        "quest.found_it"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Verifies the device position against the current target.
#[derive(Debug, Clone)]
pub struct CheckGps {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for CheckGps {
    fn command_type(&self) -> &'static str {
        "quest.check_gps"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Verifies a photo of the current waypoint.
#[derive(Debug, Clone)]
pub struct SubmitPhoto {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Encoded image bytes.
    pub photo: Vec<u8>,
    /// MIME type of `photo`.
    pub media_type: String,
    /// Optional reference images of the waypoint.
    pub reference_images: Vec<Vec<u8>>,
}

impl Command for SubmitPhoto {
    fn command_type(&self) -> &'static str {
        "quest.submit_photo"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Sends a chat message to the guide.
#[derive(Debug, Clone)]
pub struct SendMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// What the participants typed.
    pub message: String,
}

impl Command for SendMessage {
    fn command_type(&self) -> &'static str {
        "quest.send_message"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Backs out of the pending verification.
#[derive(Debug, Clone)]
pub struct CancelVerification {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for CancelVerification {
    fn command_type(&self) -> &'static str {
        "quest.cancel_verification"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn starts_narration(&self) -> bool {
        false
    }
}

/// Reveals the next hint level of the current waypoint.
#[derive(Debug, Clone)]
pub struct RevealHint {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for RevealHint {
    fn command_type(&self) -> &'static str {
        "quest.reveal_hint"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// What a facilitator passcode should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    /// Mark the current waypoint verified.
    SkipWaypoint,
    /// Open the hint and chat gates now.
    UnlockHints,
}

/// Facilitator passcode entry.
#[derive(Debug, Clone)]
pub struct AttemptOverride {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The passcode as typed.
    pub passcode: String,
    /// What to do if it matches.
    pub action: OverrideAction,
}

impl Command for AttemptOverride {
    fn command_type(&self) -> &'static str {
        "quest.attempt_override"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Leaves the celebration for the next waypoint or home base.
#[derive(Debug, Clone)]
pub struct ContinueQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for ContinueQuest {
    fn command_type(&self) -> &'static str {
        "quest.continue"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Restores the session to its defaults.
#[derive(Debug, Clone)]
pub struct ResetQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for ResetQuest {
    fn command_type(&self) -> &'static str {
        "quest.reset"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn starts_narration(&self) -> bool {
        false
    }
}
