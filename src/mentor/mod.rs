//! The mentor/judge flow behind the dashboard.
//!
//! [`Mentor`] owns everything a request handler needs: both file stores, the
//! model client, the clock and the single user's [`Session`]. It is cheap to
//! clone and is used directly as the router state.

mod session;

pub use session::*;

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use thiserror::Error;

use crate::challenge::challenge_for;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::gemini::{GenerateRequest, ImagePart, ModelCatalog, VisionModel};
use crate::models::*;
use crate::photo::{DecodeError, Photo, PhotoFormat};
use crate::prompt;
use crate::store::{HistoryStore, JournalError, JournalStore};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Upload a photo first")]
    NoPhoto,

    #[error("A review is already in progress")]
    Busy,

    #[error("An error occurred: {0}")]
    Generation(String),
}

#[derive(Clone)]
pub struct Mentor {
    history: HistoryStore,
    journal: JournalStore,
    model: Arc<dyn VisionModel>,
    catalog: ModelCatalog,
    clock: Arc<dyn Clock>,
    language: String,
    session: Arc<Mutex<Session>>,
}

impl Mentor {
    pub fn new(config: &Config, model: Arc<dyn VisionModel>) -> Self {
        Self {
            history: HistoryStore::in_dir(config.data_dir()),
            journal: JournalStore::in_dir(config.data_dir()),
            model,
            catalog: ModelCatalog::new(config.default_model.clone()),
            clock: Arc::new(SystemClock),
            language: config.language.clone(),
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("session lock poisoned")
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn challenge(&self) -> Challenge {
        challenge_for(self.today())
    }

    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    // ============================================================
    // History and journal
    // ============================================================

    pub fn history(&self) -> History {
        self.history.load()
    }

    pub fn calendar(&self) -> Calendar {
        self.history.load().calendar(self.today())
    }

    pub fn journal(&self) -> io::Result<Option<String>> {
        self.journal.read()
    }

    pub fn save_note(&self, text: &str) -> Result<(), JournalError> {
        self.journal.append(text, self.clock.now())
    }

    pub async fn models(&self) -> Vec<String> {
        self.catalog.models(self.model.as_ref()).await
    }

    // ============================================================
    // Session transitions
    // ============================================================

    /// Decode an upload and make it the current photo. A failed decode
    /// leaves the session untouched.
    pub fn upload(&self, bytes: &[u8], format: PhotoFormat) -> Result<PhotoView, FlowError> {
        let photo = Photo::decode(bytes, format).inspect_err(|e| {
            tracing::warn!(format = format.as_str(), "Rejected upload: {}", e);
        })?;

        let mut session = self.session();
        let loaded = session.load(photo)?;
        tracing::info!(
            format = format.as_str(),
            bytes = loaded.photo.size_bytes(),
            exif = loaded.photo.exif.status(),
            attributes = loaded.metadata.len(),
            "Photo loaded"
        );
        Ok(loaded.view())
    }

    pub fn choose_mode(&self, challenge: bool) -> Result<ModeView, FlowError> {
        let mut session = self.session();
        let mode = session.choose_mode(challenge)?;
        Ok(ModeView {
            state: session.state(),
            challenge,
            button_label: mode.button_label().to_string(),
        })
    }

    pub fn reset(&self) -> Result<(), FlowError> {
        self.session().reset()
    }

    /// Send the current photo to the model and record the outcome.
    ///
    /// The request runs on its own task so a dropped HTTP connection cannot
    /// strand the session in `RequestInFlight`.
    pub async fn review(&self, model: Option<String>) -> Result<Review, FlowError> {
        let ticket = self.session().begin()?;

        let mentor = self.clone();
        match tokio::spawn(async move { mentor.run(ticket, model).await }).await {
            Ok(result) => result,
            Err(e) => {
                let message = format!("Review task failed: {}", e);
                tracing::error!("{}", message);
                self.session().fail(message.clone());
                Err(FlowError::Generation(message))
            }
        }
    }

    async fn run(&self, ticket: Ticket, model: Option<String>) -> Result<Review, FlowError> {
        let challenge = self.challenge();
        let (system_instruction, user_prompt) = match ticket.mode {
            ReviewMode::Judge => (
                prompt::judge_system_instruction(&self.language),
                prompt::judge_prompt(&challenge),
            ),
            ReviewMode::Mentor => (
                prompt::mentor_system_instruction(&self.language),
                prompt::format_mentor_prompt(&ticket.photo.device, &ticket.photo.metadata),
            ),
        };

        let model = match model.filter(|m| !m.trim().is_empty()) {
            Some(m) => m,
            None => self
                .models()
                .await
                .into_iter()
                .next()
                .unwrap_or_else(|| self.catalog.default_model().to_string()),
        };

        let request = GenerateRequest {
            model: model.clone(),
            system_instruction,
            prompt: user_prompt,
            image: ImagePart {
                mime_type: ticket.photo.photo.format.mime_type().to_string(),
                data: ticket.photo.photo.data.clone(),
            },
        };

        let text = match self.model.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(model = %model, mode = ticket.mode.as_str(), "Review failed: {}", e);
                let message = e.to_string();
                self.session().fail(message.clone());
                return Err(FlowError::Generation(message));
            }
        };

        let accepted = ticket.mode == ReviewMode::Judge && prompt::is_accepted(&text);
        let celebrate = accepted && self.record_success();

        let review = Review {
            mode: ticket.mode,
            model,
            text,
            accepted,
            celebrate,
        };
        self.session().finish(review.clone());
        Ok(review)
    }

    fn record_success(&self) -> bool {
        let today = self.today();
        match self.history.mark_success(today) {
            Ok(_) => {
                tracing::info!(date = %today, challenge = %self.challenge().title, "Challenge accepted");
                true
            }
            Err(e) => {
                tracing::error!(date = %today, "Failed to record challenge success: {:#}", e);
                false
            }
        }
    }

    // ============================================================
    // Dashboard
    // ============================================================

    pub async fn dashboard(&self) -> DashboardView {
        let models = self.models().await;
        let challenge = self.challenge();
        let calendar = self.calendar();
        let journal = self.journal().unwrap_or_else(|e| {
            tracing::warn!("Failed to read journal: {}", e);
            None
        });

        let session = self.session();
        DashboardView {
            state: session.state(),
            challenge_label: format!("🎯 Submit to the '{}' challenge!", challenge.title),
            challenge,
            challenge_mode: session.challenge_mode(),
            button_label: session.mode().button_label().to_string(),
            calendar,
            models,
            photo: session.photo().map(LoadedPhoto::view),
            result: session.result().cloned(),
            error: session.error().map(str::to_string),
            journal,
        }
    }
}
