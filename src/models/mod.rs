//! Domain models for Photo Mentor.
//!
//! # Persistent
//!
//! - [`History`]: dates on which the daily challenge was accepted.
//! - The journal is plain Markdown and has no model beyond [`JournalInput`].
//!
//! # Per upload
//!
//! These live only as long as the loaded photo:
//!
//! - [`PhotoMetadata`]: display-ready EXIF attributes.
//! - [`Review`]: the model's answer to a submission.
//!
//! # Derived
//!
//! - [`Challenge`]: recomputed from the date on every request, never stored.
//! - [`DashboardView`]: one render of the page.

mod challenge;
mod dashboard;
mod history;
mod metadata;
mod review;

pub use challenge::*;
pub use dashboard::*;
pub use history::*;
pub use metadata::*;
pub use review::*;
