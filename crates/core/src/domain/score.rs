use super::DomainError;

/// Percentage of correctly answered questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(u16);

impl Score {
    pub const MIN: u16 = 0;
    pub const MAX: u16 = 100;

    pub fn new(value: u16) -> Result<Self, DomainError> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidScore(value))
        }
    }

    /// `correct / total * 100` in floating point, ties rounded to even.
    /// Returns `None` when `total` is zero.
    pub fn from_ratio(correct: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }

        let ratio = correct.min(total) as f64 / total as f64;
        let rounded = (ratio * f64::from(Self::MAX)).round_ties_even();

        // ratio <= 1.0 keeps rounded within [0, 100].
        Some(Self(rounded as u16))
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u16> for Score {
    type Error = DomainError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u16 {
    fn from(value: Score) -> Self {
        value.value()
    }
}

/// Minimum score required for an attempt to count as passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassThreshold(u16);

impl PassThreshold {
    pub const DEFAULT: u16 = 70;

    pub fn new(value: u16) -> Result<Self, DomainError> {
        if value <= Score::MAX {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidThreshold(value))
        }
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn is_passed_by(self, score: Score) -> bool {
        score.value() >= self.0
    }
}

impl Default for PassThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::{PassThreshold, Score};

    #[test]
    fn valid_score_is_created() {
        let score = Score::new(100).expect("100 should be valid");

        assert_eq!(score.value(), 100);
    }

    #[test]
    fn invalid_score_is_rejected() {
        let err = Score::new(101).expect_err("101 should be rejected");

        assert_eq!(
            err.to_string(),
            "invalid score: 101. score must be in [0, 100]"
        );
    }

    #[test]
    fn ratio_is_rounded_to_nearest_percent() {
        assert_eq!(Score::from_ratio(1, 3).map(Score::value), Some(33));
        assert_eq!(Score::from_ratio(2, 3).map(Score::value), Some(67));
        assert_eq!(Score::from_ratio(3, 3).map(Score::value), Some(100));
        assert_eq!(Score::from_ratio(0, 7).map(Score::value), Some(0));
    }

    #[test]
    fn exact_halves_round_to_even() {
        // 1/8 = 12.5%, 3/8 = 37.5%
        assert_eq!(Score::from_ratio(1, 8).map(Score::value), Some(12));
        assert_eq!(Score::from_ratio(3, 8).map(Score::value), Some(38));
        // 1/200 = 0.5%
        assert_eq!(Score::from_ratio(1, 200).map(Score::value), Some(0));
    }

    #[test]
    fn ratio_follows_float_arithmetic() {
        // 23/40 * 100 is 57.49999... in f64, 109/200 * 100 is 54.50000...1
        assert_eq!(Score::from_ratio(23, 40).map(Score::value), Some(57));
        assert_eq!(Score::from_ratio(109, 200).map(Score::value), Some(55));
    }

    #[test]
    fn zero_total_has_no_score() {
        assert_eq!(Score::from_ratio(0, 0), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let threshold = PassThreshold::default();

        assert_eq!(threshold.value(), 70);
        assert!(threshold.is_passed_by(Score::new(70).expect("valid score")));
        assert!(!threshold.is_passed_by(Score::new(69).expect("valid score")));
    }

    #[test]
    fn threshold_above_hundred_is_rejected() {
        assert!(PassThreshold::new(101).is_err());
        assert!(PassThreshold::new(100).is_ok());
    }
}
