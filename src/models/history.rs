use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker stored against a date once that day's challenge was accepted.
pub const SUCCESS_MARKER: &str = "✅";

/// Number of days shown in the calendar strip, today included.
pub const CALENDAR_DAYS: i64 = 7;

/// Challenge successes keyed by ISO date (`YYYY-MM-DD`).
///
/// Values are kept as raw JSON so a hand-edited file with other markers still
/// loads; only the presence of a date counts as a success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: BTreeMap<String, Value>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, date: NaiveDate) {
        self.entries
            .insert(date_key(date), Value::String(SUCCESS_MARKER.to_string()));
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entries.contains_key(&date_key(date))
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Value> {
        self.entries.get(&date_key(date))
    }

    /// Total achievements recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The rolling strip of the last [`CALENDAR_DAYS`] days, oldest first.
    pub fn calendar(&self, today: NaiveDate) -> Calendar {
        let days = (0..CALENDAR_DAYS)
            .rev()
            .map(|back| {
                let date = today - Duration::days(back);
                let success = self.contains(date);
                let label = if success {
                    SUCCESS_MARKER.to_string()
                } else {
                    date.format("%d").to_string()
                };
                CalendarDay {
                    date,
                    label,
                    success,
                }
            })
            .collect();

        Calendar {
            days,
            total: self.len(),
        }
    }
}

/// One cell in the calendar strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// `✅` on a success day, otherwise the two-digit day of month.
    pub label: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub days: Vec<CalendarDay>,
    /// All successes ever recorded, not just the visible week.
    pub total: usize,
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
