//! goaltrack configuration.
//!
//! Loaded from `~/.goaltrack/config.toml`. Every key is optional; a missing
//! file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};

use jiff::SignedDuration;
use serde::Deserialize;

use crate::manager::{
    DEFAULT_LOW_PROGRESS_PERCENT, DEFAULT_MAX_GOALS_PER_USER, DEFAULT_MIN_UPDATE_INTERVAL_MINUTES,
    DEFAULT_STALLED_SHARE, Policy,
};
use crate::storage::DEFAULT_MAX_BACKUPS;

/// Longest accepted update interval: one hundred years.
const MAX_UPDATE_INTERVAL_MINUTES: i64 = 525_600 * 100;

/// goaltrack configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// The user commands act as when `--user` and `GOALTRACK_USER` are unset.
    pub default_user: Option<String>,

    /// Where goals and backups are stored.
    pub data_dir: Option<PathBuf>,

    pub max_goals_per_user: usize,
    pub min_update_interval_minutes: i64,

    /// Active goals below this percentage are called out by `recommend`.
    pub low_progress_percent: f64,

    /// Largest share of stalled goals that still counts as healthy.
    pub stalled_share: f64,

    pub max_backups: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_user: None,
            data_dir: None,
            max_goals_per_user: DEFAULT_MAX_GOALS_PER_USER,
            min_update_interval_minutes: DEFAULT_MIN_UPDATE_INTERVAL_MINUTES,
            low_progress_percent: DEFAULT_LOW_PROGRESS_PERCENT,
            stalled_share: DEFAULT_STALLED_SHARE,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl Config {
    /// Load config from `~/.goaltrack/config.toml`.
    /// Returns defaults if the file is missing.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file. Returns defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;
        config
            .validate()
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        Ok(config)
    }

    /// The config file path: `~/.goaltrack/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".goaltrack").join("config.toml"))
    }

    /// The manager policy described by this config.
    pub fn policy(&self) -> Policy {
        Policy {
            max_goals_per_user: self.max_goals_per_user,
            min_update_interval: SignedDuration::from_mins(self.min_update_interval_minutes),
            low_progress_percent: self.low_progress_percent,
            stalled_share: self.stalled_share,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_goals_per_user == 0 {
            return Err("max-goals-per-user must be at least 1".to_string());
        }
        if self.min_update_interval_minutes < 0 {
            return Err("min-update-interval-minutes must not be negative".to_string());
        }
        if self.min_update_interval_minutes > MAX_UPDATE_INTERVAL_MINUTES {
            return Err(format!(
                "min-update-interval-minutes must be at most {MAX_UPDATE_INTERVAL_MINUTES}"
            ));
        }
        if !(0.0..=100.0).contains(&self.low_progress_percent) {
            return Err("low-progress-percent must be between 0 and 100".to_string());
        }
        if !(0.0..=1.0).contains(&self.stalled_share) {
            return Err("stalled-share must be between 0 and 1".to_string());
        }
        if self.max_backups == 0 {
            return Err("max-backups must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();

        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.max_goals_per_user, 50);
        assert_eq!(config.min_update_interval_minutes, 60);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let (_dir, path) = write_config(
            r#"
            default-user = "alice"
            min-update-interval-minutes = 30
            "#,
        );

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.default_user.as_deref(), Some("alice"));
        assert_eq!(config.policy().min_update_interval, SignedDuration::from_mins(30));
        assert_eq!(config.max_backups, DEFAULT_MAX_BACKUPS);
    }

    #[test]
    fn full_file() {
        let (_dir, path) = write_config(
            r#"
            default-user = "bob"
            data-dir = "/tmp/goals"
            max-goals-per-user = 5
            min-update-interval-minutes = 0
            low-progress-percent = 10.0
            stalled-share = 0.25
            max-backups = 2
            "#,
        );

        let config = Config::load_from(&path).unwrap();
        let policy = config.policy();

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/goals")));
        assert_eq!(policy.max_goals_per_user, 5);
        assert!(policy.min_update_interval.is_zero());
        assert!((policy.stalled_share - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.max_backups, 2);
    }

    #[test]
    fn longest_update_interval_is_accepted() {
        let (_dir, path) = write_config("min-update-interval-minutes = 52560000\n");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(
            config.policy().min_update_interval,
            SignedDuration::from_hours(876_000)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_config("default-identity = \"x\"\n");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("invalid config"), "{err}");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for contents in [
            "max-goals-per-user = 0",
            "min-update-interval-minutes = -1",
            "min-update-interval-minutes = 52560001",
            "min-update-interval-minutes = 9223372036854775807",
            "stalled-share = 1.5",
            "low-progress-percent = 120.0",
            "max-backups = 0",
        ] {
            let (_dir, path) = write_config(contents);
            assert!(Config::load_from(&path).is_err(), "{contents}");
        }
    }
}
