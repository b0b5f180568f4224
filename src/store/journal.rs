use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

pub const JOURNAL_FILE: &str = "journal.md";

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Write something first!")]
    Empty,

    #[error("Failed to write journal: {0}")]
    Io(#[from] io::Error),
}

/// Append-only Markdown learning journal.
///
/// Each note becomes a block:
///
/// ```text
/// ### 2024-05-01 18:30
/// The shadows tell the story.
///
/// ```
#[derive(Debug, Clone)]
pub struct JournalStore {
    path: PathBuf,
}

impl JournalStore {
    pub fn open(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(JOURNAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a note stamped with `at`. Blank notes are rejected before the
    /// file is touched.
    pub fn append(&self, text: &str, at: NaiveDateTime) -> Result<(), JournalError> {
        if text.trim().is_empty() {
            return Err(JournalError::Empty);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write!(file, "### {}\n{}\n\n", at.format("%Y-%m-%d %H:%M"), text)?;

        tracing::debug!(path = %self.path.display(), "Saved journal note");
        Ok(())
    }

    /// The whole journal, or `None` before the first note.
    pub fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
