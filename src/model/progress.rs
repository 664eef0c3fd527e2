//! Progress entries: the append-only history of a goal.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One recorded progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    /// When the update was recorded.
    pub recorded_at: Timestamp,

    /// The goal's value before this update.
    pub previous_value: f64,

    /// The value set by this update.
    pub value: f64,

    /// Optional free-text note. Empty when none was given.
    #[serde(default)]
    pub note: String,
}

impl ProgressEntry {
    pub fn new(recorded_at: Timestamp, previous_value: f64, value: f64, note: &str) -> Self {
        Self {
            recorded_at,
            previous_value,
            value,
            note: note.trim().to_string(),
        }
    }

    /// One-line rendering: `[2024-01-01 12:00] value: 25 - note`.
    pub fn formatted(&self) -> String {
        let at = self.recorded_at.strftime("%Y-%m-%d %H:%M");
        if self.note.is_empty() {
            format!("[{at}] value: {}", self.value)
        } else {
            format!("[{at}] value: {} - {}", self.value, self.note)
        }
    }
}
