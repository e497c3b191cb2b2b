//! Persistent storage using SQLite (rusqlite)
//!
//! This module provides:
//! - OS-standard data directory location (via `directories` crate)
//! - SQLite database with schema versioning
//! - The term table backing [`DictionaryProvider`]
//! - The append-only submission log backing [`SubmissionLog`]
//! - Per-session result rows

use crate::error::StorageError;
use crate::game::arbitrator::{SubmissionLog, SubmissionRecord};
use crate::game::dictionary::{DictionaryEntry, DictionaryProvider, EntryFilter};
use crate::game::session::SessionSummary;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Current schema version. Bump this when making schema changes.
/// Version history:
/// - v1: meta, terms and submissions tables
/// - v2: sessions table for end-of-session summaries
const SCHEMA_VERSION: u32 = 2;

const DATABASE_FILE: &str = "termrace.db";

/// The main storage handle.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the storage database.
    ///
    /// `path` overrides the default location, which is the OS data directory:
    /// - Linux: `$XDG_DATA_HOME/termrace/` or `~/.local/share/termrace/`
    /// - macOS: `~/Library/Application Support/termrace/`
    pub fn open(path: Option<&Path>) -> Result<Self, StorageError> {
        let db_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let data_dir = Self::data_dir()?;
                std::fs::create_dir_all(&data_dir).map_err(StorageError::CreateDirFailed)?;
                data_dir.join(DATABASE_FILE)
            }
        };

        tracing::info!(path = %db_path.display(), "opening database");
        Self::from_connection(Connection::open(&db_path)?)
    }

    /// Open an in-memory database (tests, throwaway sessions).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        let storage = Storage { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Get the OS-standard data directory
    pub fn data_dir() -> Result<PathBuf, StorageError> {
        ProjectDirs::from("", "", "termrace")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(StorageError::NoDataDirectory)
    }

    /// Insert or replace terms in one transaction. Returns the number written.
    pub fn seed_terms(&mut self, entries: &[DictionaryEntry]) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO terms (id, display_text, difficulty_tier, description) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    &entry.display_text,
                    entry.difficulty_tier,
                    &entry.description
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(count = entries.len(), "seeded terms");
        Ok(entries.len())
    }

    /// Number of stored terms
    pub fn term_count(&self) -> Result<i64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM terms", [], |row| row.get(0))?;
        Ok(count)
    }

    /// All submissions of a session, in the order they were adjudicated.
    pub fn submissions_for(&self, session_id: &str) -> Result<Vec<SubmissionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, sequence_number, player, text, is_valid, points, combo_after, submitted_at
             FROM submissions WHERE session_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            Ok(SubmissionRecord {
                session_id: row.get(0)?,
                sequence_number: row.get::<_, i64>(1)? as u64,
                player: row.get(2)?,
                text: row.get(3)?,
                is_valid: row.get(4)?,
                points: row.get(5)?,
                combo_after: row.get(6)?,
                submitted_at: row.get::<_, i64>(7)? as u64,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Store the end-of-session summary. Re-recording a session replaces it.
    pub fn record_session(
        &self,
        session_id: &str,
        player: &str,
        summary: &SessionSummary,
        ended_at: u64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions
                (session_id, player, total_score, max_combo, correct, incorrect, passes, timeouts, turns_played, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session_id,
                player,
                summary.total_score as i64,
                summary.max_combo,
                summary.correct,
                summary.incorrect,
                summary.passes,
                summary.timeouts,
                summary.turns_played as i64,
                ended_at as i64
            ],
        )?;
        Ok(())
    }

    /// Highest recorded session score for a player
    pub fn best_score(&self, player: &str) -> Result<Option<u64>, StorageError> {
        let best: Option<i64> = self.conn.query_row(
            "SELECT MAX(total_score) FROM sessions WHERE player = ?1",
            params![player],
            |row| row.get(0),
        )?;
        Ok(best.map(|b| b as u64))
    }

    // Private helper methods

    fn initialize_schema(&self) -> Result<(), StorageError> {
        let current_version = self.get_schema_version()?;

        if current_version == 0 {
            self.create_schema_v1()?;
            self.migrate_schema(1)?;
        } else if current_version < SCHEMA_VERSION {
            self.migrate_schema(current_version)?;
        } else if current_version > SCHEMA_VERSION {
            // Database is from a newer build
            return Err(StorageError::FutureSchemaVersion {
                found: current_version,
                supported: SCHEMA_VERSION,
            });
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StorageError> {
        let table_exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='meta'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: Option<u32> = self
            .conn
            .query_row("SELECT schema_version FROM meta LIMIT 1", [], |row| row.get(0))
            .optional()?;

        Ok(version.unwrap_or(0))
    }

    fn create_schema_v1(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            -- Meta table: schema version and creation time
            CREATE TABLE meta (
                schema_version INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );

            -- Vocabulary; read-only while a session runs
            CREATE TABLE terms (
                id INTEGER PRIMARY KEY,
                display_text TEXT NOT NULL,
                difficulty_tier INTEGER NOT NULL CHECK (difficulty_tier >= 1),
                description TEXT
            );

            CREATE INDEX idx_terms_tier ON terms (difficulty_tier);

            -- Append-only log of adjudicated submissions
            CREATE TABLE submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                sequence_number INTEGER NOT NULL,
                player TEXT NOT NULL,
                text TEXT NOT NULL,
                is_valid INTEGER NOT NULL,
                points INTEGER NOT NULL,
                combo_after INTEGER NOT NULL,
                submitted_at INTEGER NOT NULL
            );

            CREATE INDEX idx_submissions_session ON submissions (session_id);
            "#,
        )?;

        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        self.conn.execute(
            "INSERT INTO meta (schema_version, created_at) VALUES (?1, ?2)",
            params![1u32, created_at],
        )?;

        Ok(())
    }

    fn migrate_schema(&self, from_version: u32) -> Result<(), StorageError> {
        let mut current_version = from_version;

        while current_version < SCHEMA_VERSION {
            match current_version {
                1 => {
                    self.migrate_v1_to_v2()?;
                    current_version = 2;
                }
                _ => {
                    return Err(StorageError::MigrationFailed {
                        from: current_version,
                        to: SCHEMA_VERSION,
                        reason: format!("no migration path from version {}", current_version),
                    });
                }
            }
        }

        self.conn.execute(
            "UPDATE meta SET schema_version = ?1",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Migrate from schema v1 to v2: add the sessions table
    fn migrate_v1_to_v2(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                player TEXT NOT NULL,
                total_score INTEGER NOT NULL,
                max_combo INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                incorrect INTEGER NOT NULL,
                passes INTEGER NOT NULL,
                timeouts INTEGER NOT NULL,
                turns_played INTEGER NOT NULL,
                ended_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_player ON sessions (player);
            "#,
        )?;
        Ok(())
    }
}

impl DictionaryProvider for Storage {
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<DictionaryEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, display_text, difficulty_tier, description FROM terms
             WHERE (?1 IS NULL OR difficulty_tier >= ?1) AND (?2 IS NULL OR difficulty_tier <= ?2)
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![filter.min_tier, filter.max_tier], |row| {
            Ok(DictionaryEntry {
                id: row.get(0)?,
                display_text: row.get(1)?,
                difficulty_tier: row.get(2)?,
                description: row.get(3)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

impl SubmissionLog for Storage {
    fn append(&mut self, record: &SubmissionRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO submissions
                (session_id, sequence_number, player, text, is_valid, points, combo_after, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &record.session_id,
                record.sequence_number as i64,
                &record.player,
                &record.text,
                record.is_valid,
                record.points,
                record.combo_after,
                record.submitted_at as i64
            ],
        )?;
        Ok(())
    }
}
