use serde::{Deserialize, Serialize};

/// A daily photography challenge.
///
/// Catalog entries are written as `"Title: description"`. The title is the
/// text before the first `:` and the description is the trimmed remainder;
/// `text` keeps the entry as written, which is what the judge is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub title: String,
    pub description: String,
    pub text: String,
}

impl Challenge {
    pub fn parse(text: &str) -> Self {
        let (title, description) = match text.split_once(':') {
            Some((title, rest)) => (title.trim(), rest.trim()),
            None => (text.trim(), ""),
        };
        Self {
            title: title.to_string(),
            description: description.to_string(),
            text: text.to_string(),
        }
    }
}
