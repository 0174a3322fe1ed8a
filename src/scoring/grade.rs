use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::GradeThresholds;

/// Final letter grade of a scored account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    pub const ALL: [Grade; 6] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::E, Grade::F];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a composite score against the grade thresholds.
///
/// Bands are checked from the top: a score must be strictly above a
/// threshold to earn the grade, so a score equal to `very_good` is a B.
/// Anything at or below `unacceptable`, and NaN, is an F.
pub fn classify(score: f64, thresholds: &GradeThresholds) -> Grade {
    let bands = [
        (thresholds.very_good, Grade::A),
        (thresholds.good, Grade::B),
        (thresholds.bad, Grade::C),
        (thresholds.very_bad, Grade::D),
        (thresholds.unacceptable, Grade::E),
    ];
    bands
        .iter()
        .find(|(threshold, _)| score > *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::F)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> GradeThresholds {
        GradeThresholds::default()
    }

    #[test]
    fn test_classify_bands() {
        let t = thresholds();
        assert_eq!(classify(2790.0, &t), Grade::A);
        assert_eq!(classify(2200.0, &t), Grade::B);
        assert_eq!(classify(1800.0, &t), Grade::C);
        assert_eq!(classify(1200.0, &t), Grade::D);
        assert_eq!(classify(900.0, &t), Grade::E);
        assert_eq!(classify(100.0, &t), Grade::F);
    }

    #[test]
    fn test_boundaries_belong_to_lower_grade() {
        let t = thresholds();
        assert_eq!(classify(2500.0, &t), Grade::B);
        assert_eq!(classify(2000.0, &t), Grade::C);
        assert_eq!(classify(1500.0, &t), Grade::D);
        assert_eq!(classify(1000.0, &t), Grade::E);
        assert_eq!(classify(750.0, &t), Grade::F);
    }

    #[test]
    fn test_just_above_boundaries() {
        let t = thresholds();
        assert_eq!(classify(2500.0001, &t), Grade::A);
        assert_eq!(classify(750.0001, &t), Grade::E);
    }

    #[test]
    fn test_classify_is_total() {
        let t = thresholds();
        assert_eq!(classify(f64::INFINITY, &t), Grade::A);
        assert_eq!(classify(f64::NEG_INFINITY, &t), Grade::F);
        assert_eq!(classify(-50.0, &t), Grade::F);
        assert_eq!(classify(f64::NAN, &t), Grade::F);

        // Every score in a sweep lands in exactly one band, and grades never improve as scores drop
        let mut previous = Grade::A;
        let mut score = 3000.0;
        while score > 0.0 {
            let grade = classify(score, &t);
            assert!(grade >= previous, "grade improved at {}", score);
            previous = grade;
            score -= 12.5;
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Grade::C.to_string(), "C");
        assert_eq!(Grade::ALL.len(), 6);
    }
}
