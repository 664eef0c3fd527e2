//! Backups: compressed, checksummed snapshots of `goals.json`.
//!
//! A backup is the zstd-compressed goals document plus a `.sha256` sidecar
//! holding the hex digest of the compressed bytes. Only the newest
//! `max_backups` are kept; older ones are removed after each new backup.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::goals::parse_document;
use super::{Result, Storage, StorageError};

pub(super) const BACKUP_DIR: &str = "backups";

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = ".json.zst";
const CHECKSUM_EXTENSION: &str = ".sha256";
const COMPRESSION_LEVEL: i32 = 3;
const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A backup on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// File name within the backup directory, e.g. `backup_20240101_120000.json.zst`.
    pub name: String,

    /// When the snapshot was taken, to the second, as encoded in the name.
    pub created_at: Timestamp,

    /// Size of the compressed snapshot.
    pub size_bytes: u64,

    /// Recorded SHA-256 of the compressed snapshot, if the sidecar is present.
    pub checksum: Option<String>,
}

impl Storage {
    /// Snapshots `goals.json` into a new backup named after `at`.
    ///
    /// With no goals file yet, the snapshot is an empty document.
    pub fn create_backup(&self, at: Timestamp) -> Result<BackupInfo> {
        let snapshot = match fs::read(self.goals_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => b"{}".to_vec(),
            Err(e) => return Err(e.into()),
        };
        let compressed = zstd::encode_all(snapshot.as_slice(), COMPRESSION_LEVEL)?;
        let checksum = digest(&compressed);

        let name = format!(
            "{BACKUP_PREFIX}{}{BACKUP_EXTENSION}",
            at.strftime(NAME_TIME_FORMAT)
        );
        let path = self.backup_dir().join(&name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StorageError::BackupExists(name.clone()),
                _ => e.into(),
            })?;
        file.write_all(&compressed)?;
        fs::write(checksum_path(&path), &checksum)?;
        info!(backup = %name, bytes = compressed.len(), "created backup");

        self.rotate_backups()?;

        Ok(BackupInfo {
            created_at: backup_time(&name).unwrap_or(at),
            name,
            size_bytes: compressed.len() as u64,
            checksum: Some(checksum),
        })
    }

    /// Lists backups, oldest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        let entries = match fs::read_dir(self.backup_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(backups),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if !is_backup_name(&name) {
                continue;
            }
            let Some(created_at) = backup_time(&name) else {
                debug!(file = %name, "skipping backup with unreadable time");
                continue;
            };
            let checksum = fs::read_to_string(checksum_path(&entry.path()))
                .ok()
                .map(|s| s.trim().to_string());
            backups.push(BackupInfo {
                name,
                created_at,
                size_bytes: entry.metadata()?.len(),
                checksum,
            });
        }
        // Names embed a sortable timestamp.
        backups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(backups)
    }

    /// Checks a backup against its recorded checksum.
    ///
    /// A backup without a checksum sidecar does not verify.
    pub fn verify_backup(&self, name: &str) -> Result<bool> {
        let path = self.existing_backup(name)?;
        let compressed = fs::read(&path)?;
        let expected = match fs::read_to_string(checksum_path(&path)) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(digest(&compressed) == expected.trim())
    }

    /// Replaces `goals.json` with the contents of a backup.
    ///
    /// The backup must verify and decompress to a valid goals document;
    /// otherwise the current goals file is left as it was.
    pub fn restore_backup(&self, name: &str) -> Result<()> {
        if !self.verify_backup(name)? {
            return Err(StorageError::ChecksumMismatch(name.to_string()));
        }
        let compressed = fs::read(self.backup_dir().join(name))?;
        let snapshot = zstd::decode_all(compressed.as_slice())?;
        let json = String::from_utf8(snapshot)
            .map_err(|e| StorageError::Corrupt(format!("{name}: {e}")))?;
        parse_document(&json)?;

        fs::write(self.goals_path(), json)?;
        info!(backup = %name, "restored backup");
        Ok(())
    }

    /// Removes the oldest backups beyond `max_backups`.
    fn rotate_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        let excess = backups.len().saturating_sub(self.max_backups);
        for backup in &backups[..excess] {
            let path = self.backup_dir().join(&backup.name);
            remove_if_exists(&path)?;
            remove_if_exists(&checksum_path(&path))?;
            debug!(backup = %backup.name, "rotated out old backup");
        }
        Ok(())
    }

    fn existing_backup(&self, name: &str) -> Result<PathBuf> {
        let path = self.backup_dir().join(name);
        if !is_backup_name(name) || !path.is_file() {
            return Err(StorageError::BackupNotFound(name.to_string()));
        }
        Ok(path)
    }
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Whether `name` looks like a backup file. Rejects anything path-like.
fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX)
        && name.ends_with(BACKUP_EXTENSION)
        && !name.contains(['/', '\\'])
}

/// The UTC time embedded in a backup name.
fn backup_time(name: &str) -> Option<Timestamp> {
    let stamp = name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_EXTENSION)?;
    let time = DateTime::strptime(NAME_TIME_FORMAT, stamp).ok()?;
    Some(time.to_zoned(TimeZone::UTC).ok()?.timestamp())
}

fn checksum_path(backup: &Path) -> PathBuf {
    let mut name = backup.as_os_str().to_owned();
    name.push(CHECKSUM_EXTENSION);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::SignedDuration;
    use tempfile::TempDir;

    use crate::model::Goal;

    const MAX_BACKUPS: usize = 3;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("data"), MAX_BACKUPS).unwrap();
        (dir, storage)
    }

    fn base_time() -> Timestamp {
        Timestamp::new(1_704_110_400, 0).unwrap() // 2024-01-01 12:00:00 UTC
    }

    fn sample_goal(title: &str) -> Goal {
        Goal::new(title, "Test backup", 100.0, base_time()).unwrap()
    }

    #[test]
    fn backup_is_named_after_its_time() {
        let (_dir, storage) = test_storage();

        let info = storage.create_backup(base_time()).unwrap();

        assert_eq!(info.name, "backup_20240101_120000.json.zst");
        assert_eq!(info.created_at, base_time());
        assert!(info.size_bytes > 0);
        assert_eq!(storage.list_backups().unwrap(), vec![info]);
    }

    #[test]
    fn backup_without_goals_restores_empty() {
        let (_dir, storage) = test_storage();
        let info = storage.create_backup(base_time()).unwrap();

        storage.save_goals("user", &[sample_goal("Later")]).unwrap();
        storage.restore_backup(&info.name).unwrap();

        assert!(storage.list_users().unwrap().is_empty());
    }

    #[test]
    fn restore_brings_back_backed_up_goals() {
        let (_dir, storage) = test_storage();
        let goal = sample_goal("Backup Test");
        storage.save_goals("default", &[goal.clone()]).unwrap();
        let info = storage.create_backup(base_time()).unwrap();

        storage.save_goals("default", &[]).unwrap();
        storage.restore_backup(&info.name).unwrap();

        assert_eq!(storage.load_goals("default").unwrap(), vec![goal]);
    }

    #[test]
    fn duplicate_backup_time_fails() {
        let (_dir, storage) = test_storage();
        storage.create_backup(base_time()).unwrap();

        let err = storage.create_backup(base_time()).unwrap_err();
        assert!(matches!(err, StorageError::BackupExists(_)));
    }

    #[test]
    fn old_backups_are_rotated_out() {
        let (_dir, storage) = test_storage();
        for hour in 0..5 {
            let at = base_time() + SignedDuration::from_hours(hour);
            storage.create_backup(at).unwrap();
        }

        let names: Vec<String> = storage
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(
            names,
            [
                "backup_20240101_140000.json.zst",
                "backup_20240101_150000.json.zst",
                "backup_20240101_160000.json.zst",
            ]
        );
        let sidecars = fs::read_dir(storage.backup_dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(CHECKSUM_EXTENSION)
            })
            .count();
        assert_eq!(sidecars, MAX_BACKUPS);
    }

    #[test]
    fn tampered_backup_fails_verification_and_restore() {
        let (_dir, storage) = test_storage();
        storage.save_goals("default", &[sample_goal("Keep")]).unwrap();
        let info = storage.create_backup(base_time()).unwrap();
        assert!(storage.verify_backup(&info.name).unwrap());

        fs::write(storage.backup_dir().join(&info.name), b"garbage").unwrap();

        assert!(!storage.verify_backup(&info.name).unwrap());
        let err = storage.restore_backup(&info.name).unwrap_err();
        assert!(matches!(err, StorageError::ChecksumMismatch(_)));
        assert_eq!(storage.load_goals("default").unwrap().len(), 1);
    }

    #[test]
    fn missing_sidecar_does_not_verify() {
        let (_dir, storage) = test_storage();
        let info = storage.create_backup(base_time()).unwrap();
        fs::remove_file(checksum_path(&storage.backup_dir().join(&info.name))).unwrap();

        assert!(!storage.verify_backup(&info.name).unwrap());
        assert_eq!(storage.list_backups().unwrap()[0].checksum, None);
    }

    #[test]
    fn unknown_or_path_like_names_are_not_found() {
        let (_dir, storage) = test_storage();

        for name in [
            "backup_20990101_000000.json.zst",
            "../goals.json",
            "backup_/../../x.json.zst",
        ] {
            let err = storage.restore_backup(name).unwrap_err();
            assert!(matches!(err, StorageError::BackupNotFound(_)), "{name}");
        }
    }

    #[test]
    fn unrelated_files_are_not_listed() {
        let (_dir, storage) = test_storage();
        fs::write(storage.backup_dir().join("notes.txt"), "hi").unwrap();

        assert!(storage.list_backups().unwrap().is_empty());
    }

    #[test]
    fn listed_backups_carry_their_creation_time() {
        let (_dir, storage) = test_storage();
        let at = base_time() + SignedDuration::new(90, 500_000_000);
        let info = storage.create_backup(at).unwrap();
        fs::write(storage.backup_dir().join("backup_garbled.json.zst"), "x").unwrap();

        let listed = storage.list_backups().unwrap();

        assert_eq!(listed, vec![info]);
        assert_eq!(
            listed[0].created_at,
            base_time() + SignedDuration::from_secs(90)
        );
    }
}
