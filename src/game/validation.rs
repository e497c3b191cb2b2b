//! Answer validation against the active turn
//!
//! Matching is exact and case-sensitive against the stored display text,
//! after trimming surrounding whitespace. The constraint-letter check is the
//! one case-insensitive step: the submission is lowercased before looking for
//! the (lowercase) constraint letter.

use super::dictionary::{DictionaryEntry, TermDictionary};
use super::turn::{Challenge, Turn};
use serde::{Deserialize, Serialize};

/// Result of validating a submission, with the specific reason on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult<'a> {
    /// Submission matches the turn
    Valid { entry: &'a DictionaryEntry },
    /// Nothing left after trimming
    Empty,
    /// Typing turn answered with something other than the target
    WrongWord { expected: String },
    /// Text is not a known term
    NotInDictionary,
    /// Known term, but it lacks the constraint letter
    MissingConstraint { letter: char },
}

impl ValidationResult<'_> {
    /// Returns true if the submission is valid
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid { .. })
    }

    /// Returns a user-friendly message
    pub fn message(&self) -> String {
        match self {
            ValidationResult::Valid { entry } => format!("OK ({})", entry.display_text),
            ValidationResult::Empty => "Nothing to submit".to_string(),
            ValidationResult::WrongWord { expected } => format!("MISS (expected {})", expected),
            ValidationResult::NotInDictionary => "NOPE (not a known term)".to_string(),
            ValidationResult::MissingConstraint { letter } => {
                format!("NOPE (must contain '{}')", letter)
            }
        }
    }

    /// Why an incorrect submission missed. `None` for valid and empty input.
    pub fn miss_reason(&self) -> Option<MissReason> {
        match self {
            ValidationResult::Valid { .. } | ValidationResult::Empty => None,
            ValidationResult::WrongWord { .. } => Some(MissReason::WrongWord),
            ValidationResult::NotInDictionary => Some(MissReason::NotInDictionary),
            ValidationResult::MissingConstraint { .. } => Some(MissReason::MissingConstraint),
        }
    }
}

/// Categorized reasons for incorrect submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    WrongWord,
    NotInDictionary,
    MissingConstraint,
}

impl MissReason {
    pub fn label(&self) -> &'static str {
        match self {
            MissReason::WrongWord => "Wrong Word",
            MissReason::NotInDictionary => "Not In Dictionary",
            MissReason::MissingConstraint => "Missing Letter",
        }
    }
}

/// Adjudicated submission. Points are filled in by the session from the
/// score calculator; the validator itself only decides the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub is_valid: bool,
    pub matched_entry: Option<DictionaryEntry>,
    pub points_awarded: u32,
    pub miss: Option<MissReason>,
}

impl SubmissionResult {
    pub fn from_validation(result: &ValidationResult<'_>, points_awarded: u32) -> Self {
        match result {
            ValidationResult::Valid { entry } => Self {
                is_valid: true,
                matched_entry: Some((*entry).clone()),
                points_awarded,
                miss: None,
            },
            other => Self {
                is_valid: false,
                matched_entry: None,
                points_awarded: 0,
                miss: other.miss_reason(),
            },
        }
    }
}

/// Validate a submission against the active turn
///
/// Typing turns: the trimmed text must equal the target word and name a
/// dictionary entry. Constraint turns: the trimmed text must name a
/// dictionary entry that contains the constraint letter.
pub fn validate_answer<'a>(
    submitted: &str,
    turn: &Turn,
    dictionary: &'a TermDictionary,
) -> ValidationResult<'a> {
    let text = submitted.trim();
    if text.is_empty() {
        return ValidationResult::Empty;
    }

    match &turn.challenge {
        Challenge::Typing { target_word } => {
            if text != target_word.as_str() {
                return ValidationResult::WrongWord {
                    expected: target_word.clone(),
                };
            }
            match dictionary.lookup(text) {
                Some(entry) => ValidationResult::Valid { entry },
                None => ValidationResult::NotInDictionary,
            }
        }
        Challenge::Constraint { constraint_char } => {
            let Some(entry) = dictionary.lookup(text) else {
                return ValidationResult::NotInDictionary;
            };
            let letter = constraint_char.to_ascii_lowercase();
            if text.to_lowercase().contains(letter) {
                ValidationResult::Valid { entry }
            } else {
                ValidationResult::MissingConstraint { letter }
            }
        }
    }
}
