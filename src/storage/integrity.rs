//! Data directory reports: what is stored and whether it holds together.

use std::collections::HashSet;
use std::{fs, io};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::model::Goal;

use super::goals::Document;
use super::{Result, Storage, StorageError};

/// Sizes and counts for everything under the data directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataStatistics {
    /// Zero when `goals.json` does not exist yet.
    pub goals_file_bytes: u64,
    pub goals_file_modified: Option<Timestamp>,
    pub users: usize,

    /// Stored records, including any that no longer decode.
    pub goal_records: usize,
    pub progress_entries: usize,
    pub backups: usize,
    pub backup_bytes: u64,
}

/// A stored record that does not decode as a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub username: String,

    /// 0-based position in the user's array.
    pub index: usize,
}

/// Findings of an integrity check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    /// `goals.json` is absent or parses as a goals document.
    pub goals_file_valid: bool,
    pub unreadable_records: Vec<RecordLocation>,

    /// Ids stored more than once, across all users.
    pub duplicate_ids: Vec<Uuid>,
    pub blank_usernames: usize,
    pub backups_checked: usize,

    /// Backups that fail checksum verification.
    pub failed_backups: Vec<String>,
}

impl IntegrityReport {
    pub fn is_sound(&self) -> bool {
        self.goals_file_valid
            && self.unreadable_records.is_empty()
            && self.duplicate_ids.is_empty()
            && self.blank_usernames == 0
            && self.failed_backups.is_empty()
    }
}

impl Storage {
    pub fn data_statistics(&self) -> Result<DataStatistics> {
        let mut stats = DataStatistics::default();
        match fs::metadata(self.goals_path()) {
            Ok(meta) => {
                stats.goals_file_bytes = meta.len();
                stats.goals_file_modified = meta
                    .modified()
                    .ok()
                    .and_then(|t| Timestamp::try_from(t).ok());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let document = self.read_document()?;
        stats.users = document.len();
        for records in document.values() {
            stats.goal_records += records.len();
            stats.progress_entries += records
                .iter()
                .filter_map(|record| record.get("history").and_then(Value::as_array))
                .map(Vec::len)
                .sum::<usize>();
        }

        let backups = self.list_backups()?;
        stats.backups = backups.len();
        stats.backup_bytes = backups.iter().map(|b| b.size_bytes).sum();
        Ok(stats)
    }

    /// Checks the goals file record by record and verifies every backup.
    ///
    /// A corrupt goals file is a finding, not an error; the backups are
    /// still checked.
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        let mut report = IntegrityReport::default();
        match self.read_document() {
            Ok(document) => {
                report.goals_file_valid = true;
                check_records(&document, &mut report);
            }
            Err(StorageError::Corrupt(reason)) => {
                warn!(%reason, "goals file does not parse");
            }
            Err(e) => return Err(e),
        }

        for backup in self.list_backups()? {
            report.backups_checked += 1;
            if !self.verify_backup(&backup.name)? {
                warn!(backup = %backup.name, "backup failed verification");
                report.failed_backups.push(backup.name);
            }
        }
        Ok(report)
    }
}

fn check_records(document: &Document, report: &mut IntegrityReport) {
    let mut seen = HashSet::new();
    for (username, records) in document {
        if username.trim().is_empty() {
            report.blank_usernames += 1;
        }
        for (index, record) in records.iter().enumerate() {
            match Goal::deserialize(record) {
                Ok(goal) => {
                    if !seen.insert(goal.id) {
                        report.duplicate_ids.push(goal.id);
                    }
                }
                Err(_) => report.unreadable_records.push(RecordLocation {
                    username: username.clone(),
                    index,
                }),
            }
        }
    }
}
