use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::models::History;

pub const HISTORY_FILE: &str = "challenges_history.json";

/// JSON file of challenge successes.
///
/// The file is opened, read or rewritten, and closed on every call. There is
/// no locking; concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn open(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything recorded so far. Never fails: a missing, unreadable or
    /// malformed file reads as an empty history.
    pub fn load(&self) -> History {
        match self.try_load() {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable history: {:#}", e);
                History::new()
            }
        }
    }

    fn try_load(&self) -> Result<History> {
        if !self.path.exists() {
            return Ok(History::new());
        }

        let content = fs::read_to_string(&self.path).context("Failed to read history file")?;
        let history =
            serde_json::from_str(&content).context("History file is not a JSON object")?;

        Ok(history)
    }

    /// Record a success for `date` and rewrite the file.
    pub fn mark_success(&self, date: NaiveDate) -> Result<History> {
        let mut history = self.load();
        history.mark(date);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let content =
            serde_json::to_string_pretty(&history).context("Failed to serialize history")?;
        fs::write(&self.path, content).context("Failed to write history file")?;

        tracing::info!(%date, total = history.len(), "Recorded challenge success");
        Ok(history)
    }
}
