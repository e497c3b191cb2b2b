//! Scoring coefficients: typing speed buckets and letter rarity tiers

/// Speed buckets as (upper bound in ms, inclusive; coefficient), ascending.
const SPEED_BUCKETS: [(u64, f64); 5] = [
    (1000, 3.0),
    (2000, 2.5),
    (3000, 2.0),
    (5000, 1.5),
    (8000, 1.2),
];

/// Coefficient for anything slower than the last bucket
const SLOWEST_COEFFICIENT: f64 = 1.0;

/// Letter tiers grouped by English letter frequency. Rarer letters are
/// harder to build a word around and pay more.
const CONSTRAINT_TIERS: [(&str, f64); 6] = [
    ("aeiousrtnl", 2.0),
    ("cdhpm", 3.0),
    ("bfgkvwy", 4.0),
    ("jq", 6.0),
    ("x", 7.0),
    ("z", 8.0),
];

/// Coefficient for characters outside the table
pub const DEFAULT_CONSTRAINT_COEFFICIENT: f64 = 3.0;

/// Multiplier for a typing turn answered after `duration_ms`.
///
/// Always in [1.0, 3.0] and non-increasing in the duration.
pub fn speed_coefficient(duration_ms: u64) -> f64 {
    SPEED_BUCKETS
        .iter()
        .find(|(limit, _)| duration_ms <= *limit)
        .map(|(_, coefficient)| *coefficient)
        .unwrap_or(SLOWEST_COEFFICIENT)
}

/// Multiplier for a constraint turn on `c`. Case-insensitive.
pub fn constraint_coefficient(c: char) -> f64 {
    let lower = c.to_ascii_lowercase();
    CONSTRAINT_TIERS
        .iter()
        .find(|(letters, _)| letters.contains(lower))
        .map(|(_, coefficient)| *coefficient)
        .unwrap_or(DEFAULT_CONSTRAINT_COEFFICIENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_bucket_edges() {
        assert_eq!(speed_coefficient(0), 3.0);
        assert_eq!(speed_coefficient(999), 3.0);
        assert_eq!(speed_coefficient(1000), 3.0);
        assert_eq!(speed_coefficient(1001), 2.5);
        assert_eq!(speed_coefficient(2000), 2.5);
        assert_eq!(speed_coefficient(3000), 2.0);
        assert_eq!(speed_coefficient(4200), 1.5);
        assert_eq!(speed_coefficient(8000), 1.2);
        assert_eq!(speed_coefficient(8001), 1.0);
        assert_eq!(speed_coefficient(9000), 1.0);
        assert_eq!(speed_coefficient(u64::MAX), 1.0);
    }

    #[test]
    fn test_speed_is_non_increasing() {
        let mut previous = speed_coefficient(0);
        for ms in (0..10_000).step_by(7) {
            let current = speed_coefficient(ms);
            assert!(current <= previous, "{}ms gave {} after {}", ms, current, previous);
            assert!((1.0..=3.0).contains(&current));
            previous = current;
        }
    }

    #[test]
    fn test_constraint_table() {
        assert_eq!(constraint_coefficient('a'), 2.0);
        assert_eq!(constraint_coefficient('m'), 3.0);
        assert_eq!(constraint_coefficient('k'), 4.0);
        assert_eq!(constraint_coefficient('j'), 6.0);
        assert_eq!(constraint_coefficient('x'), 7.0);
        assert_eq!(constraint_coefficient('z'), 8.0);
    }

    #[test]
    fn test_constraint_case_insensitive() {
        assert_eq!(constraint_coefficient('Q'), 6.0);
        assert_eq!(constraint_coefficient('Z'), 8.0);
    }

    #[test]
    fn test_constraint_defined_for_every_letter() {
        for c in 'a'..='z' {
            let coefficient = constraint_coefficient(c);
            assert!((2.0..=8.0).contains(&coefficient), "{} -> {}", c, coefficient);
        }
    }

    #[test]
    fn test_constraint_unknown_defaults() {
        assert_eq!(constraint_coefficient('7'), DEFAULT_CONSTRAINT_COEFFICIENT);
        assert_eq!(constraint_coefficient('-'), DEFAULT_CONSTRAINT_COEFFICIENT);
        assert_eq!(constraint_coefficient('é'), DEFAULT_CONSTRAINT_COEFFICIENT);
    }
}
