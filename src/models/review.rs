use serde::{Deserialize, Serialize};

/// Which system instruction a submission is reviewed with.
///
/// - `Mentor`: free-form artistic and technical feedback
/// - `Judge`: pass/fail against today's challenge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    Mentor,
    Judge,
}

impl ReviewMode {
    pub fn from_challenge_flag(challenge: bool) -> Self {
        if challenge {
            Self::Judge
        } else {
            Self::Mentor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mentor => "mentor",
            Self::Judge => "judge",
        }
    }

    /// Label of the submit button for this mode.
    pub fn button_label(&self) -> &'static str {
        match self {
            Self::Mentor => "✨ Ask for mentoring",
            Self::Judge => "✨ Evaluate my challenge!",
        }
    }
}

/// The model's answer to one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub mode: ReviewMode,
    /// Model identifier the request was sent to.
    pub model: String,
    /// Response text, rendered verbatim.
    pub text: String,
    /// Judge mode only: the verdict contained `ACCEPTED`/`ACEITO`.
    pub accepted: bool,
    /// The acceptance was recorded in the history and deserves a celebration.
    pub celebrate: bool,
}

/// Where the single user's session currently stands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    ImageLoaded,
    AwaitingModeChoice,
    RequestInFlight,
    ResultDisplayed,
}

/// Input for toggling challenge-submission mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeInput {
    pub challenge: bool,
}

/// Input for submitting the loaded photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewInput {
    /// Model to ask; defaults to the first available one.
    #[serde(default)]
    pub model: Option<String>,
}

/// Input for saving a journal note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalInput {
    pub text: String,
}
