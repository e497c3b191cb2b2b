//! Turn generation
//!
//! Each turn is either a typing turn (reproduce a presented term exactly) or
//! a constraint turn (answer with any term containing a given letter).
//! 90% of draws pick typing. When the picked kind cannot be satisfied by the
//! dictionary the other kind is tried once, and the caller sees that in the
//! returned [`TurnDraw`].

use super::coefficient::constraint_coefficient;
use super::dictionary::{DictionaryEntry, TermDictionary};
use super::{pick_index, RandomSource};
use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Share of turns that are typing turns
pub const TYPING_TURN_RATIO: f64 = 0.9;

/// Tiers eligible for typing turns; anything harder is never presented
pub const TYPING_TIERS: RangeInclusive<u32> = 1..=7;

/// Preferred word length (characters) for typing targets
pub const PREFERRED_WORD_LENGTH: RangeInclusive<usize> = 3..=12;

/// Typing turns score with the speed coefficient measured at submit time
pub const TYPING_PLACEHOLDER_COEFFICIENT: f64 = 1.0;

/// Constraint letters are drawn uniformly from here, whether or not any term
/// contains the drawn letter
pub const CONSTRAINT_LETTERS: RangeInclusive<char> = 'a'..='z';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Typing,
    Constraint,
}

impl TurnKind {
    pub fn other(self) -> Self {
        match self {
            TurnKind::Typing => TurnKind::Constraint,
            TurnKind::Constraint => TurnKind::Typing,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TurnKind::Typing => "typing",
            TurnKind::Constraint => "constraint",
        }
    }
}

/// What the players must produce this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Challenge {
    Typing { target_word: String },
    /// Always a lowercase ASCII letter
    Constraint { constraint_char: char },
}

/// One challenge instance shared by everyone in the room. Replaced wholesale
/// by the next generated turn, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub challenge: Challenge,
    pub coefficient: f64,
    /// Milliseconds, from the session clock
    pub started_at: u64,
    /// 1 for the first turn of a session
    pub sequence_number: u64,
}

impl Turn {
    pub fn kind(&self) -> TurnKind {
        match self.challenge {
            Challenge::Typing { .. } => TurnKind::Typing,
            Challenge::Constraint { .. } => TurnKind::Constraint,
        }
    }

    pub fn target_word(&self) -> Option<&str> {
        match &self.challenge {
            Challenge::Typing { target_word } => Some(target_word),
            Challenge::Constraint { .. } => None,
        }
    }

    pub fn constraint_char(&self) -> Option<char> {
        match self.challenge {
            Challenge::Constraint { constraint_char } => Some(constraint_char),
            Challenge::Typing { .. } => None,
        }
    }

    /// Short prompt for display
    pub fn prompt(&self) -> String {
        match &self.challenge {
            Challenge::Typing { target_word } => format!("Type: {}", target_word),
            Challenge::Constraint { constraint_char } => {
                format!("Any term containing '{}'", constraint_char)
            }
        }
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDraw {
    /// The randomly chosen kind was satisfiable
    Primary(Turn),
    /// The chosen kind was not; this turn is of the other kind
    Fallback { turn: Turn, unsatisfied: TurnKind },
}

impl TurnDraw {
    pub fn turn(&self) -> &Turn {
        match self {
            TurnDraw::Primary(turn) | TurnDraw::Fallback { turn, .. } => turn,
        }
    }

    pub fn into_turn(self) -> Turn {
        match self {
            TurnDraw::Primary(turn) | TurnDraw::Fallback { turn, .. } => turn,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TurnDraw::Fallback { .. })
    }
}

/// Produces the sequence of turns for one session.
#[derive(Debug, Clone, Default)]
pub struct TurnGenerator {
    sequence_number: u64,
}

impl TurnGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the last generated turn (0 before the first)
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Generate the next turn.
    ///
    /// The sequence number advances only when a turn is produced, so it never
    /// skips. Fails with [`GameError::DictionaryExhausted`] when neither kind
    /// can be built.
    pub fn generate_next_turn(
        &mut self,
        dictionary: &TermDictionary,
        rng: &mut dyn RandomSource,
        now_ms: u64,
    ) -> Result<TurnDraw, GameError> {
        let chosen = if rng.uniform() < TYPING_TURN_RATIO {
            TurnKind::Typing
        } else {
            TurnKind::Constraint
        };

        let (challenge, fell_back) = match draw_challenge(chosen, dictionary, rng) {
            Some(challenge) => (challenge, false),
            None => {
                tracing::warn!(
                    unsatisfied = chosen.label(),
                    "turn kind unsatisfiable, falling back"
                );
                match draw_challenge(chosen.other(), dictionary, rng) {
                    Some(challenge) => (challenge, true),
                    None => return Err(GameError::DictionaryExhausted),
                }
            }
        };

        self.sequence_number += 1;
        let coefficient = match &challenge {
            Challenge::Typing { .. } => TYPING_PLACEHOLDER_COEFFICIENT,
            Challenge::Constraint { constraint_char } => constraint_coefficient(*constraint_char),
        };
        let turn = Turn {
            challenge,
            coefficient,
            started_at: now_ms,
            sequence_number: self.sequence_number,
        };

        if fell_back {
            Ok(TurnDraw::Fallback {
                turn,
                unsatisfied: chosen,
            })
        } else {
            Ok(TurnDraw::Primary(turn))
        }
    }
}

/// Terms a typing turn may present: tier-eligible entries, narrowed to the
/// preferred length when that leaves anything.
pub fn typing_candidates(dictionary: &TermDictionary) -> Vec<&DictionaryEntry> {
    let eligible: Vec<&DictionaryEntry> = dictionary
        .entries_in_tiers(*TYPING_TIERS.start(), *TYPING_TIERS.end())
        .collect();

    let preferred: Vec<&DictionaryEntry> = eligible
        .iter()
        .copied()
        .filter(|e| PREFERRED_WORD_LENGTH.contains(&e.char_len()))
        .collect();

    if preferred.is_empty() {
        eligible
    } else {
        preferred
    }
}

fn draw_challenge(
    kind: TurnKind,
    dictionary: &TermDictionary,
    rng: &mut dyn RandomSource,
) -> Option<Challenge> {
    match kind {
        TurnKind::Typing => {
            let candidates = typing_candidates(dictionary);
            if candidates.is_empty() {
                return None;
            }
            let entry = candidates[pick_index(rng, candidates.len())];
            Some(Challenge::Typing {
                target_word: entry.display_text.clone(),
            })
        }
        TurnKind::Constraint => {
            if dictionary.is_empty() {
                return None;
            }
            let count = CONSTRAINT_LETTERS.count();
            let constraint_char = CONSTRAINT_LETTERS.nth(pick_index(rng, count))?;
            Some(Challenge::Constraint { constraint_char })
        }
    }
}
