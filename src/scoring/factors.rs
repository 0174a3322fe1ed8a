use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric band predicate.
///
/// Range format: "<N", "<=N", ">N", ">=N", "N" (exact), "N-M" (inclusive range)
/// or interval notation "[a, b)", "(a, b]", "[a, b]", "(a, b)".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeOp {
    LessThan(f64),
    LessEqual(f64),
    GreaterThan(f64),
    GreaterEqual(f64),
    Equal(f64),
    Between(f64, f64), // Inclusive range: N-M
    Interval {
        low: f64,
        low_closed: bool,
        high: f64,
        high_closed: bool,
    },
}

impl RangeOp {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let op = if let Some(interval) = parse_interval(s)? {
            interval
        } else if let Some(val) = s.strip_prefix(">=") {
            RangeOp::GreaterEqual(parse_bound(val)?)
        } else if let Some(val) = s.strip_prefix("<=") {
            RangeOp::LessEqual(parse_bound(val)?)
        } else if let Some(val) = s.strip_prefix('>') {
            RangeOp::GreaterThan(parse_bound(val)?)
        } else if let Some(val) = s.strip_prefix('<') {
            RangeOp::LessThan(parse_bound(val)?)
        } else if let Some((low, high)) = s.split_once('-').filter(|(low, _)| !low.is_empty()) {
            // "1e-5" also contains a dash, so only treat it as a range when both sides parse
            match (low.trim().parse::<f64>(), high.trim().parse::<f64>()) {
                (Ok(low), Ok(high)) => {
                    if low > high {
                        bail!("Invalid range format: {} (lower bound exceeds upper bound)", s)
                    }
                    RangeOp::Between(low, high)
                }
                _ => RangeOp::Equal(parse_bound(s)?),
            }
        } else {
            RangeOp::Equal(parse_bound(s)?)
        };
        Ok(op)
    }

    /// NaN never matches any band.
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            RangeOp::LessThan(n) => value < n,
            RangeOp::LessEqual(n) => value <= n,
            RangeOp::GreaterThan(n) => value > n,
            RangeOp::GreaterEqual(n) => value >= n,
            RangeOp::Equal(n) => value == n,
            RangeOp::Between(low, high) => value >= low && value <= high,
            RangeOp::Interval {
                low,
                low_closed,
                high,
                high_closed,
            } => {
                let above = if low_closed { value >= low } else { value > low };
                let below = if high_closed { value <= high } else { value < high };
                above && below
            }
        }
    }

    /// Multiply every bound by `factor`, turning a relative band
    /// ("below half the installment") into an absolute one.
    pub fn scaled(&self, factor: f64) -> RangeOp {
        match *self {
            RangeOp::LessThan(n) => RangeOp::LessThan(n * factor),
            RangeOp::LessEqual(n) => RangeOp::LessEqual(n * factor),
            RangeOp::GreaterThan(n) => RangeOp::GreaterThan(n * factor),
            RangeOp::GreaterEqual(n) => RangeOp::GreaterEqual(n * factor),
            RangeOp::Equal(n) => RangeOp::Equal(n * factor),
            RangeOp::Between(low, high) => RangeOp::Between(low * factor, high * factor),
            RangeOp::Interval {
                low,
                low_closed,
                high,
                high_closed,
            } => RangeOp::Interval {
                low: low * factor,
                low_closed,
                high: high * factor,
                high_closed,
            },
        }
    }
}

fn parse_bound(s: &str) -> Result<f64> {
    let value: f64 = s.trim().parse()?;
    if value.is_nan() {
        bail!("Range bound must be a number: {}", s.trim())
    }
    Ok(value)
}

fn parse_interval(s: &str) -> Result<Option<RangeOp>> {
    let low_closed = match s.chars().next() {
        Some('[') => true,
        Some('(') => false,
        _ => return Ok(None),
    };
    let high_closed = match s.chars().last() {
        Some(']') => true,
        Some(')') => false,
        _ => bail!("Invalid interval: {} (missing closing bracket)", s),
    };

    let inner = &s[1..s.len() - 1];
    let Some((low, high)) = inner.split_once(',') else {
        bail!("Invalid interval: {} (expected two comma-separated bounds)", s)
    };
    let low = parse_bound(low)?;
    let high = parse_bound(high)?;
    if low > high {
        bail!("Invalid interval: {} (lower bound exceeds upper bound)", s)
    }

    Ok(Some(RangeOp::Interval {
        low,
        low_closed,
        high,
        high_closed,
    }))
}

/// How category patterns are compared against a (lowercased) field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Contains,
    Suffix,
    Exact,
}

impl MatchKind {
    pub fn matches(&self, value: &str, pattern: &str) -> bool {
        match self {
            MatchKind::Contains => value.contains(pattern),
            MatchKind::Suffix => value.ends_with(pattern),
            MatchKind::Exact => value == pattern,
        }
    }
}

/// Rated point levels awarded by individual criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatedLevel {
    Unacceptable,
    VeryBad,
    Bad,
    Good,
    VeryGood,
    Excellent,
}

impl RatedLevel {
    pub fn name(&self) -> &'static str {
        match self {
            RatedLevel::Unacceptable => "unacceptable",
            RatedLevel::VeryBad => "very_bad",
            RatedLevel::Bad => "bad",
            RatedLevel::Good => "good",
            RatedLevel::VeryGood => "very_good",
            RatedLevel::Excellent => "excellent",
        }
    }
}

impl FromStr for RatedLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "unacceptable" => Ok(RatedLevel::Unacceptable),
            "very_bad" => Ok(RatedLevel::VeryBad),
            "bad" => Ok(RatedLevel::Bad),
            "good" => Ok(RatedLevel::Good),
            "very_good" => Ok(RatedLevel::VeryGood),
            "excellent" => Ok(RatedLevel::Excellent),
            other => bail!("Unknown rated level: {}", other),
        }
    }
}

/// Grade threshold levels. There is no "excellent" threshold: anything above
/// `very_good` is already the top grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdLevel {
    Unacceptable,
    VeryBad,
    Bad,
    Good,
    VeryGood,
}

impl ThresholdLevel {
    pub fn name(&self) -> &'static str {
        match self {
            ThresholdLevel::Unacceptable => "unacceptable",
            ThresholdLevel::VeryBad => "very_bad",
            ThresholdLevel::Bad => "bad",
            ThresholdLevel::Good => "good",
            ThresholdLevel::VeryGood => "very_good",
        }
    }
}

impl FromStr for ThresholdLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "unacceptable" => Ok(ThresholdLevel::Unacceptable),
            "very_bad" => Ok(ThresholdLevel::VeryBad),
            "bad" => Ok(ThresholdLevel::Bad),
            "good" => Ok(ThresholdLevel::Good),
            "very_good" => Ok(ThresholdLevel::VeryGood),
            other => bail!("Unknown grade threshold level: {}", other),
        }
    }
}

/// Names the constant a band awards.
///
/// Written as `very_bad` for a rated constant or `grade.unacceptable` for a
/// grade-threshold constant. The two families hold different values and a
/// band always says which one it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum PointRef {
    Rated(RatedLevel),
    Threshold(ThresholdLevel),
}

impl PointRef {
    pub const UNACCEPTABLE: PointRef = PointRef::Rated(RatedLevel::Unacceptable);
}

impl FromStr for PointRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(level) = s.strip_prefix("grade.") {
            Ok(PointRef::Threshold(level.parse()?))
        } else {
            Ok(PointRef::Rated(s.parse()?))
        }
    }
}

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointRef::Rated(level) => write!(f, "{}", level.name()),
            PointRef::Threshold(level) => write!(f, "grade.{}", level.name()),
        }
    }
}

impl TryFrom<String> for PointRef {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PointRef> for String {
    fn from(value: PointRef) -> Self {
        value.to_string()
    }
}
