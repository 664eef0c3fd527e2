//! Goal storage: save, load, and list per-user goal collections.

use std::collections::BTreeMap;
use std::{fs, io};

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::Goal;

use super::{Result, Storage, StorageError};

pub(super) const GOALS_FILE: &str = "goals.json";

/// The on-disk shape of `goals.json`.
///
/// Records stay as raw JSON until a user's goals are requested, so one bad
/// record never blocks loading another user.
pub(super) type Document = BTreeMap<String, Vec<Value>>;

impl Storage {
    /// Replaces the stored goals for `username`.
    ///
    /// Stored records that do not decode as goals were never loaded, so they
    /// are carried over after the given goals instead of being dropped.
    pub fn save_goals(&self, username: &str, goals: &[Goal]) -> Result<()> {
        let mut document = self.read_document()?;
        let mut records = goals
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        let unreadable = unreadable_records(document.remove(username).unwrap_or_default(), goals);
        if !unreadable.is_empty() {
            warn!(username, count = unreadable.len(), "keeping unreadable goal records");
            records.extend(unreadable);
        }
        document.insert(username.to_string(), records);

        let json = serde_json::to_string_pretty(&document)?;
        fs::write(self.goals_path(), json)?;
        debug!(username, count = goals.len(), "saved goals");
        Ok(())
    }

    /// Loads the stored goals for `username`.
    ///
    /// Records that no longer decode as goals are skipped with a warning.
    pub fn load_goals(&self, username: &str) -> Result<Vec<Goal>> {
        let mut document = self.read_document()?;
        let Some(records) = document.remove(username) else {
            return Ok(Vec::new());
        };

        let mut goals = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Goal>(record) {
                Ok(goal) => goals.push(goal),
                Err(e) => warn!(username, index, error = %e, "skipping unreadable goal record"),
            }
        }
        Ok(goals)
    }

    /// Lists every user with a stored collection, sorted by name.
    pub fn list_users(&self) -> Result<Vec<String>> {
        Ok(self.read_document()?.into_keys().collect())
    }

    /// Reads `goals.json`. A missing or empty file is an empty document.
    pub(super) fn read_document(&self) -> Result<Document> {
        let json = match fs::read_to_string(self.goals_path()) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };
        if json.trim().is_empty() {
            return Ok(Document::new());
        }
        parse_document(&json)
    }
}

/// Records that fail to decode as goals, minus any whose id is among `goals`.
fn unreadable_records(records: Vec<Value>, goals: &[Goal]) -> Vec<Value> {
    records
        .into_iter()
        .filter(|record| serde_json::from_value::<Goal>(record.clone()).is_err())
        .filter(|record| {
            let id = record.get("id").and_then(Value::as_str);
            !goals.iter().any(|g| id.is_some_and(|id| id == g.id.to_string()))
        })
        .collect()
}

/// Parses a goals document, reporting shape errors as corruption.
pub(super) fn parse_document(json: &str) -> Result<Document> {
    serde_json::from_str(json).map_err(|e| StorageError::Corrupt(format!("{GOALS_FILE}: {e}")))
}
