//! Error types shared by the engine, storage and configuration layers.

use thiserror::Error;

/// Errors surfaced by the turn & scoring engine.
///
/// Only [`GameError::DictionaryExhausted`] is fatal to a session. Every other
/// variant is a rejected request that leaves combo and score untouched.
#[derive(Debug, Error)]
pub enum GameError {
    /// Neither a typing nor a constraint turn can be built from the dictionary.
    #[error("dictionary exhausted: no eligible terms for any turn kind")]
    DictionaryExhausted,

    /// Submit or pass arrived while no turn is active (not started, halted, or closed).
    #[error("no active turn: {reason}")]
    InvalidSubmissionState { reason: &'static str },

    /// A participant other than the current authority tried to mutate the session.
    #[error("{caller} may not mutate the session (authority is {authority})")]
    UnauthorizedMutation { caller: String, authority: String },

    /// Submitted text was empty after trimming.
    #[error("submission is empty")]
    MalformedInput,

    /// The dictionary provider failed while loading entries.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GameError {
    pub(crate) fn session_closed() -> Self {
        GameError::InvalidSubmissionState {
            reason: "session closed",
        }
    }

    pub(crate) fn not_started() -> Self {
        GameError::InvalidSubmissionState {
            reason: "session not started",
        }
    }

    pub(crate) fn halted() -> Self {
        GameError::InvalidSubmissionState {
            reason: "session halted",
        }
    }

    /// Whether this error stops the session from making further progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::DictionaryExhausted)
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not determine data directory
    #[error("could not determine data directory")]
    NoDataDirectory,

    /// Schema version mismatch (future version)
    #[error("database schema version {found} is newer than supported version {supported}")]
    FutureSchemaVersion { found: u32, supported: u32 },

    /// Failed to create data directory
    #[error("failed to create data directory: {0}")]
    CreateDirFailed(#[source] std::io::Error),

    /// Migration failed
    #[error("migration from v{from} to v{to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    /// A term list line could not be parsed
    #[error("invalid term on line {line}: {reason}")]
    InvalidTerm { line: usize, reason: String },
}

/// Errors raised while loading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine config directory")]
    NoConfigDirectory,
}
