use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::challenge::Challenge;
use super::history::Calendar;
use super::metadata::PhotoMetadata;
use super::review::{Review, SessionState};

/// Shown in the metadata panel when a photo carries no usable tags.
pub const NO_METADATA_NOTICE: &str = "No metadata found.";

/// What the dashboard knows about the loaded photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoView {
    pub id: Uuid,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: usize,
    /// `present`, `absent` or `malformed`.
    pub exif: String,
    pub device: String,
    pub caption: String,
    pub metadata: PhotoMetadata,
    /// `key: value` lines, or [`NO_METADATA_NOTICE`].
    pub panel: Vec<String>,
}

/// The mode toggle and the label the submit button takes with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeView {
    pub state: SessionState,
    pub challenge: bool,
    pub button_label: String,
}

/// Everything one page render needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub state: SessionState,
    pub challenge: Challenge,
    /// Label of the challenge-submission checkbox.
    pub challenge_label: String,
    pub challenge_mode: bool,
    pub button_label: String,
    pub calendar: Calendar,
    pub models: Vec<String>,
    pub photo: Option<PhotoView>,
    pub result: Option<Review>,
    pub error: Option<String>,
    /// Full journal text, absent until the first note is saved.
    pub journal: Option<String>,
}
