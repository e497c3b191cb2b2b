//! Host configuration loaded from `config.toml`
//!
//! The file lives in the OS config directory (`~/.config/termrace/` on
//! Linux). Every field is optional; a missing file means defaults.

use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default session length in seconds
pub const DEFAULT_SESSION_SECONDS: u32 = 90;

/// Default minimum gap between two passes
pub const DEFAULT_PASS_COOLDOWN_MS: u64 = 3_000;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Name shown in records; also the session authority
    pub player_name: String,
    /// Length of a session
    pub session_seconds: u32,
    /// Per-turn limit; 0 disables turn timeouts
    pub turn_seconds: u32,
    pub pass_cooldown_ms: u64,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Database location override
    pub database_path: Option<PathBuf>,
    /// Extra tab-separated terms added to the stored list
    pub terms_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_name: "player".to_string(),
            session_seconds: DEFAULT_SESSION_SECONDS,
            turn_seconds: 0,
            pass_cooldown_ms: DEFAULT_PASS_COOLDOWN_MS,
            log_filter: "termrace=info".to_string(),
            database_path: None,
            terms_path: None,
        }
    }
}

impl GameConfig {
    /// Load from the OS config directory, or defaults if there is no file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "termrace")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDirectory)
    }

    /// Per-turn limit in milliseconds, if enabled
    pub fn turn_limit_ms(&self) -> Option<u64> {
        (self.turn_seconds > 0).then(|| u64::from(self.turn_seconds) * 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(GameConfig::parse("").unwrap(), GameConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = GameConfig::parse(
            r#"
            player_name = "alice"
            turn_seconds = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.player_name, "alice");
        assert_eq!(config.turn_limit_ms(), Some(10_000));
        assert_eq!(config.session_seconds, DEFAULT_SESSION_SECONDS);
    }

    #[test]
    fn test_turn_limit_disabled_by_default() {
        assert_eq!(GameConfig::default().turn_limit_ms(), None);
    }

    #[test]
    fn test_bad_type_rejected() {
        assert!(GameConfig::parse("session_seconds = \"long\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pass_cooldown_ms = 500").unwrap();
        writeln!(file, "terms_path = \"/tmp/terms.tsv\"").unwrap();
        let config = GameConfig::load_from(file.path()).unwrap();
        assert_eq!(config.pass_cooldown_ms, 500);
        assert_eq!(config.terms_path, Some(PathBuf::from("/tmp/terms.tsv")));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = GameConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
