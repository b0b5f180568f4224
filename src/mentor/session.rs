use crate::models::{
    PhotoMetadata, PhotoView, Review, ReviewMode, SessionState, NO_METADATA_NOTICE,
};
use crate::photo::Photo;
use crate::prompt::DEFAULT_DEVICE;

use super::FlowError;

/// The uploaded photo together with what was read from it.
#[derive(Debug, Clone)]
pub struct LoadedPhoto {
    pub photo: Photo,
    pub metadata: PhotoMetadata,
    pub device: String,
}

impl LoadedPhoto {
    pub fn new(photo: Photo) -> Self {
        let metadata = photo.exif.metadata();
        let device = metadata
            .device()
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
        Self {
            photo,
            metadata,
            device,
        }
    }

    pub fn view(&self) -> PhotoView {
        let panel = if self.metadata.is_empty() {
            vec![NO_METADATA_NOTICE.to_string()]
        } else {
            self.metadata.panel_lines()
        };

        PhotoView {
            id: self.photo.id,
            mime_type: self.photo.format.mime_type().to_string(),
            width: self.photo.width,
            height: self.photo.height,
            size_bytes: self.photo.size_bytes(),
            exif: self.photo.exif.status().to_string(),
            device: self.device.clone(),
            caption: format!("Captured with {}", self.device),
            metadata: self.metadata.clone(),
            panel,
        }
    }
}

/// What a submission needs once the session lock is released.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub mode: ReviewMode,
    pub photo: LoadedPhoto,
}

/// The single user's progress through upload, mode choice and review.
///
/// ```text
/// Idle ─upload→ ImageLoaded ─toggle→ AwaitingModeChoice ─submit→ RequestInFlight
///                    ↑                        ↑                         │
///                    └──── upload ────────────┴──── failure ────────────┤
///                                                                       ↓
///                                                              ResultDisplayed
/// ```
///
/// Nothing changes while a request is in flight. Submitting straight from
/// `ImageLoaded` uses mentor mode.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    photo: Option<LoadedPhoto>,
    challenge: bool,
    result: Option<Review>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            photo: None,
            challenge: false,
            result: None,
            error: None,
        }
    }
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn photo(&self) -> Option<&LoadedPhoto> {
        self.photo.as_ref()
    }

    pub fn challenge_mode(&self) -> bool {
        self.challenge
    }

    pub fn mode(&self) -> ReviewMode {
        ReviewMode::from_challenge_flag(self.challenge)
    }

    pub fn result(&self) -> Option<&Review> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn ensure_not_in_flight(&self) -> Result<(), FlowError> {
        if self.state == SessionState::RequestInFlight {
            return Err(FlowError::Busy);
        }
        Ok(())
    }

    pub fn load(&mut self, photo: Photo) -> Result<&LoadedPhoto, FlowError> {
        self.ensure_not_in_flight()?;

        self.challenge = false;
        self.result = None;
        self.error = None;
        self.state = SessionState::ImageLoaded;
        Ok(self.photo.insert(LoadedPhoto::new(photo)))
    }

    pub fn choose_mode(&mut self, challenge: bool) -> Result<ReviewMode, FlowError> {
        self.ensure_not_in_flight()?;
        if self.photo.is_none() {
            return Err(FlowError::NoPhoto);
        }

        self.challenge = challenge;
        self.result = None;
        self.error = None;
        self.state = SessionState::AwaitingModeChoice;
        Ok(self.mode())
    }

    pub fn begin(&mut self) -> Result<Ticket, FlowError> {
        self.ensure_not_in_flight()?;
        let photo = self.photo.clone().ok_or(FlowError::NoPhoto)?;

        self.error = None;
        self.state = SessionState::RequestInFlight;
        Ok(Ticket {
            mode: self.mode(),
            photo,
        })
    }

    pub fn finish(&mut self, review: Review) {
        self.result = Some(review);
        self.state = SessionState::ResultDisplayed;
    }

    /// The request failed: back to choosing, with the message on display.
    pub fn fail(&mut self, message: String) {
        self.result = None;
        self.error = Some(message);
        self.state = SessionState::AwaitingModeChoice;
    }

    pub fn reset(&mut self) -> Result<(), FlowError> {
        self.ensure_not_in_flight()?;
        *self = Self::default();
        Ok(())
    }
}
