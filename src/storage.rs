//! Local persistence for goals and backups.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! <root>/
//!   goals.json                                # username → array of goal records
//!   backups/
//!     backup_20240101_120000.json.zst         # zstd-compressed goals.json snapshot
//!     backup_20240101_120000.json.zst.sha256  # hex SHA-256 of the compressed bytes
//! ```

mod backup;
mod goals;
mod integrity;

use std::{fs, io, path::PathBuf};

use jiff::Timestamp;

use crate::model::Goal;

pub use backup::BackupInfo;
pub use integrity::{DataStatistics, IntegrityReport};

/// Backups kept after rotation unless configured otherwise.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("backup already exists: {0}")]
    BackupExists(String),

    #[error("backup checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Where goal collections are persisted.
///
/// The manager only talks to this trait, so tests can swap in an in-memory
/// store and a different on-disk layout never touches business logic.
pub trait GoalStore {
    /// Replaces the stored goals for one user, leaving other users untouched.
    fn save_goals(&self, username: &str, goals: &[Goal]) -> Result<()>;

    /// Loads one user's goals. Unknown users have no goals.
    fn load_goals(&self, username: &str) -> Result<Vec<Goal>>;

    /// Every user with a stored collection.
    fn list_users(&self) -> Result<Vec<String>>;

    /// Snapshots the stored goals into a new backup.
    fn create_backup(&self, at: Timestamp) -> Result<BackupInfo>;

    /// Existing backups, oldest first.
    fn list_backups(&self) -> Result<Vec<BackupInfo>>;

    /// Replaces the stored goals with a backup's contents.
    fn restore_backup(&self, name: &str) -> Result<()>;
}

/// Local file-based storage for goals and backups.
pub struct Storage {
    root: PathBuf,
    max_backups: usize,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory and its `backups/` subdirectory are created if missing.
    pub fn new(root: impl Into<PathBuf>, max_backups: usize) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(backup::BACKUP_DIR))?;
        Ok(Self {
            root,
            max_backups: max_backups.max(1),
        })
    }

    /// Returns the default storage root: `~/.goaltrack/data/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".goaltrack").join("data"))
    }

    fn goals_path(&self) -> PathBuf {
        self.root.join(goals::GOALS_FILE)
    }

    fn backup_dir(&self) -> PathBuf {
        self.root.join(backup::BACKUP_DIR)
    }
}

impl GoalStore for Storage {
    fn save_goals(&self, username: &str, goals: &[Goal]) -> Result<()> {
        Storage::save_goals(self, username, goals)
    }

    fn load_goals(&self, username: &str) -> Result<Vec<Goal>> {
        Storage::load_goals(self, username)
    }

    fn list_users(&self) -> Result<Vec<String>> {
        Storage::list_users(self)
    }

    fn create_backup(&self, at: Timestamp) -> Result<BackupInfo> {
        Storage::create_backup(self, at)
    }

    fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        Storage::list_backups(self)
    }

    fn restore_backup(&self, name: &str) -> Result<()> {
        Storage::restore_backup(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn new_creates_root_and_backup_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");

        let storage = Storage::new(&root, DEFAULT_MAX_BACKUPS).unwrap();

        assert!(root.is_dir());
        assert!(storage.backup_dir().is_dir());
    }

    #[test]
    fn zero_max_backups_keeps_one() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path(), 0).unwrap();
        assert_eq!(storage.max_backups, 1);
    }
}
