//! User and data directory resolution.
//!
//! Every command acts on one user's goals. Rather than requiring `--user`
//! on every invocation, the user is resolved through a chain:
//!
//! 1. `--user <name>`: explicit per-command override
//! 2. `GOALTRACK_USER` env var: process/session level
//! 3. `default-user` in `~/.goaltrack/config.toml`
//! 4. `default`
//!
//! The data directory follows the same shape: `--data-dir`, then
//! `GOALTRACK_DATA_DIR`, then `data-dir` in the config, then
//! `~/.goaltrack/data`.

use std::env;
use std::path::PathBuf;

use crate::config::Config;
use crate::storage::Storage;

/// The user acted on when nothing else names one.
pub const DEFAULT_USER: &str = "default";

const USER_ENV: &str = "GOALTRACK_USER";
const DATA_DIR_ENV: &str = "GOALTRACK_DATA_DIR";

/// Resolve the acting user from the tiered resolution chain.
///
/// Blank values at any tier fall through to the next one.
pub fn resolve_user(explicit: Option<&str>, config: &Config) -> String {
    resolve_user_from(explicit, env::var(USER_ENV).ok(), config)
}

fn resolve_user_from(explicit: Option<&str>, from_env: Option<String>, config: &Config) -> String {
    // 1. Explicit --user flag.
    if let Some(user) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return user.to_string();
    }

    // 2. GOALTRACK_USER environment variable.
    if let Some(user) = from_env.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return user.to_string();
    }

    // 3. ~/.goaltrack/config.toml.
    if let Some(user) = config
        .default_user
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return user.to_string();
    }

    DEFAULT_USER.to_string()
}

/// Resolve the data directory from the tiered resolution chain.
pub fn resolve_data_dir(explicit: Option<PathBuf>, config: &Config) -> Result<PathBuf, String> {
    resolve_data_dir_from(explicit, env::var_os(DATA_DIR_ENV).map(PathBuf::from), config)
}

fn resolve_data_dir_from(
    explicit: Option<PathBuf>,
    from_env: Option<PathBuf>,
    config: &Config,
) -> Result<PathBuf, String> {
    explicit
        .or(from_env.filter(|p| !p.as_os_str().is_empty()))
        .or_else(|| config.data_dir.clone())
        .or_else(Storage::default_root)
        .ok_or_else(|| "could not determine home directory; pass --data-dir".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_user(user: &str) -> Config {
        Config {
            default_user: Some(user.to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn explicit_wins() {
        let user = resolve_user_from(Some("alice"), Some("bob".into()), &config_with_user("carol"));
        assert_eq!(user, "alice");
    }

    #[test]
    fn env_beats_config() {
        let user = resolve_user_from(None, Some("bob".into()), &config_with_user("carol"));
        assert_eq!(user, "bob");
    }

    #[test]
    fn config_beats_default() {
        let user = resolve_user_from(None, None, &config_with_user("carol"));
        assert_eq!(user, "carol");
    }

    #[test]
    fn blanks_fall_through_to_default() {
        let user = resolve_user_from(Some("  "), Some(String::new()), &config_with_user(" "));
        assert_eq!(user, DEFAULT_USER);
    }

    #[test]
    fn data_dir_chain() {
        let config = Config {
            data_dir: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };

        let explicit = resolve_data_dir_from(
            Some(PathBuf::from("/explicit")),
            Some(PathBuf::from("/from/env")),
            &config,
        );
        assert_eq!(explicit.unwrap(), PathBuf::from("/explicit"));

        let from_env = resolve_data_dir_from(None, Some(PathBuf::from("/from/env")), &config);
        assert_eq!(from_env.unwrap(), PathBuf::from("/from/env"));

        let from_config = resolve_data_dir_from(None, None, &config);
        assert_eq!(from_config.unwrap(), PathBuf::from("/from/config"));
    }
}
