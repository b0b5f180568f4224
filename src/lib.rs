//! Photo Mentor: a single-user photography dashboard.
//!
//! Upload a photo, read its EXIF data, and ask a multimodal model for either
//! mentoring feedback or a verdict on the daily challenge. Successes and
//! journal notes are kept in two local files.

pub mod api;
pub mod challenge;
pub mod clock;
pub mod config;
pub mod extractor;
pub mod gemini;
pub mod mentor;
pub mod models;
pub mod photo;
pub mod prompt;
pub mod store;
