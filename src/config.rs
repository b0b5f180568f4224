//! Runtime configuration, read from environment variables.
//!
//! - `GOOGLE_API_KEY`: Gemini credential (required to serve)
//! - `PHOTO_MENTOR_DATA_DIR`: where the history and journal live
//! - `PHOTO_MENTOR_GEMINI_URL`: API base URL
//! - `PHOTO_MENTOR_LANGUAGE`: language the model answers in
//! - `PHOTO_MENTOR_DEFAULT_MODEL`: model used when listing fails

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::gemini::{AiError, DEFAULT_BASE_URL, DEFAULT_MODEL};

const APP_NAME: &str = "photo-mentor";
const DEFAULT_LANGUAGE: &str = "Portuguese(Brazil)";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: Option<String>,
    pub data_dir: PathBuf,
    pub gemini_url: String,
    pub language: String,
    pub default_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = match env_var("PHOTO_MENTOR_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(Self {
            api_key: env_var("GOOGLE_API_KEY"),
            data_dir,
            gemini_url: env_var("PHOTO_MENTOR_GEMINI_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            language: env_var("PHOTO_MENTOR_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            default_model: env_var("PHOTO_MENTOR_DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Defaults everywhere, no credential, state under `dir` (for tests).
    pub fn for_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            api_key: None,
            data_dir: dir.into(),
            gemini_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn require_api_key(&self) -> Result<&str, AiError> {
        self.api_key.as_deref().ok_or(AiError::MissingApiKey)
    }
}

/// Unset and blank variables are the same thing.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}
