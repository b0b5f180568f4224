//! File-backed local state: the challenge history and the learning journal.

mod history;
mod journal;

pub use history::*;
pub use journal::*;
