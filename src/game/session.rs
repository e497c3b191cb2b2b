//! Turn/session state machine
//!
//! `Idle --start--> AwaitingSubmission`. A correct submission scores, bumps
//! the combo and advances to a new turn. An incorrect one resets the combo
//! and keeps the same turn so players can retry. A pass (or turn timeout)
//! resets the combo and advances without scoring. `end` closes the session;
//! anything arriving afterwards is rejected as "session closed".
//!
//! `GameSession` is single-threaded. Shared access goes through
//! [`SessionArbitrator`](super::arbitrator::SessionArbitrator).

use super::clock::Clock;
use super::dictionary::TermDictionary;
use super::scoring::{calculate_score, turn_coefficient, ScoreInput};
use super::turn::{Turn, TurnDraw, TurnGenerator, TurnKind};
use super::validation::{validate_answer, SubmissionResult, ValidationResult};
use super::RandomSource;
use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Consecutive-correct counter. `max_combo >= combo` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboState {
    pub combo: u32,
    pub max_combo: u32,
}

impl ComboState {
    fn hit(&mut self) {
        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
    }

    fn reset(&mut self) {
        self.combo = 0;
    }
}

/// Cumulative score; never decreases within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScore {
    pub total_score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created, first turn not generated yet
    Idle,
    AwaitingSubmission,
    /// Turn generation failed fatally; no turn is active
    Halted,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    /// A player asked to skip
    Requested,
    /// The external turn timer ran out
    TimedOut,
}

/// A candidate answer, adjudicated by the session authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub player: String,
    pub text: String,
    /// When the player started typing (session clock, ms). Defaults to the
    /// turn start when absent.
    pub typing_started_at: Option<u64>,
}

impl Submission {
    pub fn new(player: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            text: text.into(),
            typing_started_at: None,
        }
    }

    pub fn typing_started_at(mut self, ms: u64) -> Self {
        self.typing_started_at = Some(ms);
        self
    }
}

/// What a submit call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub result: SubmissionResult,
    pub combo: ComboState,
    pub score: SessionScore,
    /// Present when the answer was correct and the turn advanced
    pub next_turn: Option<Turn>,
    pub feedback: String,
}

/// What a pass or timeout produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub turn: Turn,
    pub combo: ComboState,
}

/// Read-only copy of the mutable session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub turn: Option<Turn>,
    pub combo: ComboState,
    pub score: SessionScore,
}

/// End-of-session statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_score: u64,
    pub max_combo: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub passes: u32,
    pub timeouts: u32,
    pub turns_played: u64,
}

impl SessionSummary {
    /// Share of adjudicated submissions that were correct, in percent
    pub fn accuracy(&self) -> f64 {
        let attempts = self.correct + self.incorrect;
        if attempts == 0 {
            0.0
        } else {
            f64::from(self.correct) * 100.0 / f64::from(attempts)
        }
    }
}

/// State changes for the broadcast layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    TurnStarted {
        turn: Turn,
        /// Set when the drawn kind was unsatisfiable and this turn is the other kind
        fallback_from: Option<TurnKind>,
    },
    SubmissionJudged {
        player: String,
        text: String,
        sequence_number: u64,
        result: SubmissionResult,
        combo: ComboState,
        score: SessionScore,
        submitted_at: u64,
    },
    TurnPassed {
        player: Option<String>,
        sequence_number: u64,
        reason: PassReason,
    },
    SessionEnded {
        summary: SessionSummary,
    },
}

/// Authoritative state of one room's game.
pub struct GameSession {
    dictionary: Arc<TermDictionary>,
    generator: TurnGenerator,
    rng: Box<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    phase: SessionPhase,
    turn: Option<Turn>,
    combo: ComboState,
    score: SessionScore,
    summary: SessionSummary,
    /// Events not yet handed to the broadcast layer
    outbox: Vec<SessionEvent>,
}

impl GameSession {
    /// Create an idle session over an already loaded dictionary.
    pub fn new(
        dictionary: Arc<TermDictionary>,
        rng: Box<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            dictionary,
            generator: TurnGenerator::new(),
            rng,
            clock,
            phase: SessionPhase::Idle,
            turn: None,
            combo: ComboState::default(),
            score: SessionScore::default(),
            summary: SessionSummary::default(),
            outbox: Vec::new(),
        }
    }

    /// Generate turn #1 and start accepting submissions.
    pub fn start(&mut self) -> Result<Turn, GameError> {
        match self.phase {
            SessionPhase::Idle => {}
            SessionPhase::AwaitingSubmission => {
                return Err(GameError::InvalidSubmissionState {
                    reason: "session already started",
                })
            }
            SessionPhase::Halted => return Err(GameError::halted()),
            SessionPhase::Ended => return Err(GameError::session_closed()),
        }
        tracing::info!(terms = self.dictionary.len(), "session starting");
        self.advance()
    }

    /// Adjudicate a submission against the active turn.
    ///
    /// Incorrect answers are not errors: they come back with
    /// `result.is_valid == false` and a reset combo. Errors mean the request
    /// was rejected and nothing changed, except [`GameError::DictionaryExhausted`],
    /// which is returned after a correct answer was already scored when no
    /// next turn could be generated.
    pub fn submit(&mut self, submission: &Submission) -> Result<SubmissionOutcome, GameError> {
        let turn = self.active_turn()?.clone();
        let now = self.clock.now_ms();

        let validation = validate_answer(&submission.text, &turn, &self.dictionary);
        if validation == ValidationResult::Empty {
            return Err(GameError::MalformedInput);
        }
        let feedback = validation.message();

        let result = match &validation {
            ValidationResult::Valid { entry } => {
                self.combo.hit();
                let latency = now.saturating_sub(submission.typing_started_at.unwrap_or(turn.started_at));
                let points = calculate_score(&ScoreInput {
                    turn_kind: turn.kind(),
                    word: &entry.display_text,
                    difficulty_tier: entry.difficulty_tier,
                    coefficient: turn_coefficient(&turn, latency),
                    combo: self.combo.combo,
                });
                self.score.total_score += u64::from(points);
                self.summary.correct += 1;
                tracing::debug!(
                    player = %submission.player,
                    word = %entry.display_text,
                    latency_ms = latency,
                    points,
                    combo = self.combo.combo,
                    "correct submission"
                );
                SubmissionResult::from_validation(&validation, points)
            }
            other => {
                self.combo.reset();
                self.summary.incorrect += 1;
                tracing::debug!(player = %submission.player, reason = ?other.miss_reason(), "incorrect submission");
                SubmissionResult::from_validation(other, 0)
            }
        };

        self.outbox.push(SessionEvent::SubmissionJudged {
            player: submission.player.clone(),
            text: submission.text.trim().to_string(),
            sequence_number: turn.sequence_number,
            result: result.clone(),
            combo: self.combo,
            score: self.score,
            submitted_at: now,
        });

        let next_turn = if result.is_valid {
            Some(self.advance()?)
        } else {
            None
        };

        Ok(SubmissionOutcome {
            result,
            combo: self.combo,
            score: self.score,
            next_turn,
            feedback,
        })
    }

    /// Skip the active turn. Resets the combo; never scores.
    pub fn pass(&mut self, player: Option<&str>) -> Result<PassOutcome, GameError> {
        self.skip(player, PassReason::Requested)
    }

    /// Handle a turn-timer expiry for turn `sequence_number`.
    ///
    /// Returns `Ok(None)` when that turn is no longer active (the timer raced
    /// a correct answer or a pass), otherwise behaves like a pass.
    pub fn expire_turn(&mut self, sequence_number: u64) -> Result<Option<PassOutcome>, GameError> {
        let active = self.active_turn()?.sequence_number;
        if active != sequence_number {
            tracing::debug!(stale = sequence_number, active, "ignoring stale turn expiry");
            return Ok(None);
        }
        self.skip(None, PassReason::TimedOut).map(Some)
    }

    /// Close the session. Returns true only for the call that closed it.
    pub fn end(&mut self) -> bool {
        if self.phase == SessionPhase::Ended {
            return false;
        }
        self.phase = SessionPhase::Ended;
        self.turn = None;
        let summary = self.summary();
        tracing::info!(
            total_score = summary.total_score,
            max_combo = summary.max_combo,
            turns = summary.turns_played,
            "session ended"
        );
        self.outbox.push(SessionEvent::SessionEnded { summary });
        true
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    pub fn combo(&self) -> ComboState {
        self.combo
    }

    pub fn score(&self) -> SessionScore {
        self.score
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            turn: self.turn.clone(),
            combo: self.combo,
            score: self.score,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total_score: self.score.total_score,
            max_combo: self.combo.max_combo,
            turns_played: self.generator.sequence_number(),
            ..self.summary
        }
    }

    /// Take the events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn active_turn(&self) -> Result<&Turn, GameError> {
        match self.phase {
            SessionPhase::Idle => Err(GameError::not_started()),
            SessionPhase::Halted => Err(GameError::halted()),
            SessionPhase::Ended => Err(GameError::session_closed()),
            SessionPhase::AwaitingSubmission => self.turn.as_ref().ok_or_else(GameError::halted),
        }
    }

    fn skip(&mut self, player: Option<&str>, reason: PassReason) -> Result<PassOutcome, GameError> {
        let sequence_number = self.active_turn()?.sequence_number;
        self.combo.reset();
        match reason {
            PassReason::Requested => self.summary.passes += 1,
            PassReason::TimedOut => self.summary.timeouts += 1,
        }
        self.outbox.push(SessionEvent::TurnPassed {
            player: player.map(str::to_string),
            sequence_number,
            reason,
        });
        let turn = self.advance()?;
        Ok(PassOutcome {
            turn,
            combo: self.combo,
        })
    }

    /// Replace the current turn with a freshly generated one.
    fn advance(&mut self) -> Result<Turn, GameError> {
        let now = self.clock.now_ms();
        match self
            .generator
            .generate_next_turn(&self.dictionary, self.rng.as_mut(), now)
        {
            Ok(draw) => {
                let fallback_from = match &draw {
                    TurnDraw::Fallback { unsatisfied, .. } => Some(*unsatisfied),
                    TurnDraw::Primary(_) => None,
                };
                let turn = draw.into_turn();
                tracing::info!(
                    sequence = turn.sequence_number,
                    kind = turn.kind().label(),
                    fallback = fallback_from.is_some(),
                    "turn started"
                );
                self.turn = Some(turn.clone());
                self.phase = SessionPhase::AwaitingSubmission;
                self.outbox.push(SessionEvent::TurnStarted {
                    turn: turn.clone(),
                    fallback_from,
                });
                Ok(turn)
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot generate a turn, halting session");
                self.turn = None;
                self.phase = SessionPhase::Halted;
                Err(e)
            }
        }
    }
}
