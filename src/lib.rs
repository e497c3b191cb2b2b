//! TERMRACE - turn & scoring engine for a multiplayer IT-term typing race
//!
//! Type the term. Or find one with the letter. Keep the combo alive.
//!
//! The engine lives in [`game`]: turn generation, answer validation, scoring
//! and the per-room session state behind [`game::arbitrator::SessionArbitrator`].
//! [`storage`] is a SQLite implementation of the dictionary provider and the
//! submission log; [`config`] and [`logging`] serve the terminal host.

pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod storage;

pub use error::{ConfigError, GameError, StorageError};
pub use game::arbitrator::{MemoryLog, SessionArbitrator, SessionSnapshot, SubmissionLog, SubmissionRecord};
pub use game::clock::{Clock, ManualClock, SystemClock};
pub use game::dictionary::{BuiltinTerms, DictionaryEntry, DictionaryProvider, EntryFilter, TermDictionary};
pub use game::session::{
    ComboState, GameSession, PassOutcome, PassReason, SessionEvent, SessionPhase, SessionScore,
    SessionSummary, Submission, SubmissionOutcome,
};
pub use game::turn::{Challenge, Turn, TurnDraw, TurnGenerator, TurnKind};
pub use game::validation::{SubmissionResult, ValidationResult};
pub use game::{RandomSource, RngSource, ScriptedRandom};
