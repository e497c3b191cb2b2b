//! Score calculation
//!
//! One formula for both turn kinds:
//! `floor(chars(word) × tier × coefficient × combo)`, never below zero.

use super::coefficient::{constraint_coefficient, speed_coefficient};
use super::turn::{Challenge, Turn, TurnKind};

/// Inputs to [`calculate_score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput<'a> {
    pub turn_kind: TurnKind,
    pub word: &'a str,
    pub difficulty_tier: u32,
    pub coefficient: f64,
    /// Combo after counting the answer being scored (1 for a first hit)
    pub combo: u32,
}

/// Points for a correct answer. A combo of 0 yields 0.
pub fn calculate_score(input: &ScoreInput<'_>) -> u32 {
    let raw = input.word.chars().count() as f64
        * f64::from(input.difficulty_tier)
        * input.coefficient
        * f64::from(input.combo);

    if raw.is_finite() && raw > 0.0 {
        // `as` saturates at u32::MAX
        raw.floor() as u32
    } else {
        0
    }
}

/// Coefficient a correct answer on `turn` earns: typing speed for typing
/// turns, letter rarity for constraint turns.
pub fn turn_coefficient(turn: &Turn, latency_ms: u64) -> f64 {
    match turn.challenge {
        Challenge::Typing { .. } => speed_coefficient(latency_ms),
        Challenge::Constraint { constraint_char } => constraint_coefficient(constraint_char),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(word: &str, tier: u32, coefficient: f64, combo: u32) -> ScoreInput<'_> {
        ScoreInput {
            turn_kind: TurnKind::Typing,
            word,
            difficulty_tier: tier,
            coefficient,
            combo,
        }
    }

    #[test]
    fn test_basic_formula() {
        assert_eq!(calculate_score(&input("ab", 2, 2.0, 1)), 8);
        assert_eq!(calculate_score(&input("git", 2, 3.0, 1)), 18);
    }

    #[test]
    fn test_floor_applied() {
        // 3 * 1 * 1.2 * 1 = 3.6
        assert_eq!(calculate_score(&input("sql", 1, 1.2, 1)), 3);
        // 5 * 3 * 1.5 * 3 = 67.5
        assert_eq!(calculate_score(&input("queue", 3, 1.5, 3)), 67);
    }

    #[test]
    fn test_zero_combo_scores_nothing() {
        assert_eq!(calculate_score(&input("kernel", 5, 3.0, 0)), 0);
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(calculate_score(&input("日本語", 1, 1.0, 1)), 3);
    }

    #[test]
    fn test_degenerate_coefficients_floor_at_zero() {
        assert_eq!(calculate_score(&input("api", 1, -2.0, 1)), 0);
        assert_eq!(calculate_score(&input("api", 1, f64::NAN, 1)), 0);
    }

    #[test]
    fn test_turn_coefficient() {
        let typing = Turn {
            challenge: Challenge::Typing {
                target_word: "git".to_string(),
            },
            coefficient: 1.0,
            started_at: 0,
            sequence_number: 1,
        };
        assert_eq!(turn_coefficient(&typing, 900), 3.0);
        assert_eq!(turn_coefficient(&typing, 9_000), 1.0);

        let constraint = Turn {
            challenge: Challenge::Constraint { constraint_char: 'z' },
            coefficient: 8.0,
            started_at: 0,
            sequence_number: 2,
        };
        assert_eq!(turn_coefficient(&constraint, 900), 8.0);
    }

    proptest! {
        #[test]
        fn score_matches_formula(
            word in "[a-z]{1,16}",
            tier in 1u32..10,
            coefficient in prop::sample::select(vec![1.0, 1.2, 1.5, 2.0, 2.5, 3.0, 4.0, 6.0, 7.0, 8.0]),
            combo in 0u32..50,
        ) {
            let score = calculate_score(&input(&word, tier, coefficient, combo));
            let expected = (word.len() as f64 * tier as f64 * coefficient * combo as f64).floor();
            prop_assert_eq!(score as f64, expected);
        }

        #[test]
        fn score_grows_with_combo(word in "[a-z]{1,12}", tier in 1u32..8, combo in 1u32..40) {
            let lower = calculate_score(&input(&word, tier, 1.5, combo));
            let higher = calculate_score(&input(&word, tier, 1.5, combo + 1));
            prop_assert!(higher >= lower);
        }
    }
}
