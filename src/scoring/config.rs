use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::factors::{MatchKind, PointRef, RatedLevel, ThresholdLevel};

/// Scoring rules as written in the config file.
///
/// Every section is optional. An omitted section falls back to the built-in
/// defaults; a provided section must be complete.
///
/// Example YAML:
/// ```yaml
/// rules:
///   weights: { payment_history: 0.2, defaulters_history: 0.45, financial_health: 0.35 }
///   criteria:
///     inquiries:
///       bands:
///         - { range: "0", points: excellent }
///         - { range: "1-2", points: bad }
///         - { range: "3-5", points: very_bad }
///         - { range: ">5", points: unacceptable }
///       fallback: unacceptable
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_points: Option<RatedPoints>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_thresholds: Option<GradeThresholds>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Weights>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_grades: Option<SubGradeConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<CriteriaConfig>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rated_points: Some(RatedPoints::default()),
            grade_thresholds: Some(GradeThresholds::default()),
            weights: Some(Weights::default()),
            sub_grades: Some(SubGradeConfig::default()),
            criteria: Some(CriteriaConfig::default()),
        }
    }
}

impl RulesConfig {
    /// Fill every omitted section with its default.
    pub fn resolved(&self) -> RulesConfig {
        let criteria = self.criteria.clone().unwrap_or_default();
        RulesConfig {
            rated_points: Some(self.rated_points.clone().unwrap_or_default()),
            grade_thresholds: Some(self.grade_thresholds.clone().unwrap_or_default()),
            weights: Some(self.weights.clone().unwrap_or_default()),
            sub_grades: Some(self.sub_grades.clone().unwrap_or_default()),
            criteria: Some(criteria.resolved()),
        }
    }
}

/// Points awarded by individual criteria.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RatedPoints {
    pub unacceptable: f64,
    pub very_bad: f64,
    pub bad: f64,
    pub good: f64,
    pub very_good: f64,
    pub excellent: f64,
}

impl Default for RatedPoints {
    fn default() -> Self {
        Self {
            unacceptable: 0.0,
            very_bad: 100.0,
            bad: 250.0,
            good: 500.0,
            very_good: 650.0,
            excellent: 800.0,
        }
    }
}

impl RatedPoints {
    pub fn get(&self, level: RatedLevel) -> f64 {
        match level {
            RatedLevel::Unacceptable => self.unacceptable,
            RatedLevel::VeryBad => self.very_bad,
            RatedLevel::Bad => self.bad,
            RatedLevel::Good => self.good,
            RatedLevel::VeryGood => self.very_good,
            RatedLevel::Excellent => self.excellent,
        }
    }

    pub fn entries(&self) -> [(RatedLevel, f64); 6] {
        [
            (RatedLevel::Unacceptable, self.unacceptable),
            (RatedLevel::VeryBad, self.very_bad),
            (RatedLevel::Bad, self.bad),
            (RatedLevel::Good, self.good),
            (RatedLevel::VeryGood, self.very_good),
            (RatedLevel::Excellent, self.excellent),
        ]
    }
}

/// Lower (exclusive) score boundaries of the letter grades, ascending.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GradeThresholds {
    pub unacceptable: f64,
    pub very_bad: f64,
    pub bad: f64,
    pub good: f64,
    pub very_good: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            unacceptable: 750.0,
            very_bad: 1000.0,
            bad: 1500.0,
            good: 2000.0,
            very_good: 2500.0,
        }
    }
}

impl GradeThresholds {
    pub fn get(&self, level: ThresholdLevel) -> f64 {
        match level {
            ThresholdLevel::Unacceptable => self.unacceptable,
            ThresholdLevel::VeryBad => self.very_bad,
            ThresholdLevel::Bad => self.bad,
            ThresholdLevel::Good => self.good,
            ThresholdLevel::VeryGood => self.very_good,
        }
    }

    /// Thresholds in ascending order.
    pub fn entries(&self) -> [(ThresholdLevel, f64); 5] {
        [
            (ThresholdLevel::Unacceptable, self.unacceptable),
            (ThresholdLevel::VeryBad, self.very_bad),
            (ThresholdLevel::Bad, self.bad),
            (ThresholdLevel::Good, self.good),
            (ThresholdLevel::VeryGood, self.very_good),
        ]
    }
}

/// Weight of each criterion in the composite score.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    pub payment_history: f64,
    pub defaulters_history: f64,
    pub financial_health: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            payment_history: 0.20,
            defaulters_history: 0.45,
            financial_health: 0.35,
        }
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.payment_history + self.defaulters_history + self.financial_health
    }
}

/// Grade letter -> base rated level, sub-grade suffix -> multiplier.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubGradeConfig {
    pub base: BTreeMap<String, RatedLevel>,
    pub multipliers: BTreeMap<String, f64>,
}

impl Default for SubGradeConfig {
    fn default() -> Self {
        let base = [
            ("A", RatedLevel::Excellent),
            ("B", RatedLevel::VeryGood),
            ("C", RatedLevel::Good),
            ("D", RatedLevel::Bad),
            ("E", RatedLevel::VeryBad),
            ("F", RatedLevel::Unacceptable),
            ("G", RatedLevel::Unacceptable),
        ]
        .into_iter()
        .map(|(letter, level)| (letter.to_string(), level))
        .collect();

        let multipliers = [("1", 1.0), ("2", 0.95), ("3", 0.90), ("4", 0.85), ("5", 0.80)]
            .into_iter()
            .map(|(suffix, factor)| (suffix.to_string(), factor))
            .collect();

        Self { base, multipliers }
    }
}

/// Numeric band table: first matching band wins.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BandTableConfig {
    pub bands: Vec<BandConfig>,

    /// Awarded when the value is present but no band matched
    pub fallback: PointRef,

    /// Awarded when the value (or its reference amount) is null. Defaults to `fallback`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<PointRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BandConfig {
    /// Range expression (e.g., "<0.5", "[0.5, 1)", "1-2")
    pub range: String,
    pub points: PointRef,
}

/// Text band table: case-insensitive pattern match, first matching band wins.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryTableConfig {
    #[serde(rename = "match")]
    pub match_kind: MatchKind,
    pub bands: Vec<CategoryBandConfig>,
    pub fallback: PointRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<PointRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryBandConfig {
    pub patterns: Vec<String>,
    pub points: PointRef,
}

/// Band tables for every criterion.
///
/// `last_payment`, `total_payment` and `credit_limit` bounds are fractions of a
/// reference amount (installment, funded amount and credit limit respectively).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CriteriaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment: Option<BandTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_payment: Option<BandTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delinquency: Option<BandTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_records: Option<BandTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_bankruptcies: Option<BandTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inquiries: Option<BandTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_status: Option<CategoryTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_ownership: Option<CategoryTableConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<BandTableConfig>,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            last_payment: Some(default_last_payment()),
            total_payment: Some(default_total_payment()),
            delinquency: Some(default_count_table(PointRef::Threshold(
                ThresholdLevel::Unacceptable,
            ))),
            public_records: Some(default_count_table(PointRef::Rated(RatedLevel::VeryBad))),
            public_bankruptcies: Some(default_count_table(PointRef::Rated(RatedLevel::VeryBad))),
            inquiries: Some(default_count_table(PointRef::Rated(RatedLevel::Unacceptable))),
            loan_status: Some(default_loan_status()),
            home_ownership: Some(default_home_ownership()),
            credit_limit: Some(default_credit_limit()),
        }
    }
}

impl CriteriaConfig {
    pub fn resolved(&self) -> CriteriaConfig {
        let defaults = CriteriaConfig::default();
        CriteriaConfig {
            last_payment: self.last_payment.clone().or(defaults.last_payment),
            total_payment: self.total_payment.clone().or(defaults.total_payment),
            delinquency: self.delinquency.clone().or(defaults.delinquency),
            public_records: self.public_records.clone().or(defaults.public_records),
            public_bankruptcies: self
                .public_bankruptcies
                .clone()
                .or(defaults.public_bankruptcies),
            inquiries: self.inquiries.clone().or(defaults.inquiries),
            loan_status: self.loan_status.clone().or(defaults.loan_status),
            home_ownership: self.home_ownership.clone().or(defaults.home_ownership),
            credit_limit: self.credit_limit.clone().or(defaults.credit_limit),
        }
    }
}

fn rated(level: RatedLevel) -> PointRef {
    PointRef::Rated(level)
}

fn band(range: &str, points: PointRef) -> BandConfig {
    BandConfig {
        range: range.to_string(),
        points,
    }
}

fn category(patterns: &[&str], points: PointRef) -> CategoryBandConfig {
    CategoryBandConfig {
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        points,
    }
}

// Below half the installment and between half and the full installment both
// award very_bad.
fn default_last_payment() -> BandTableConfig {
    BandTableConfig {
        bands: vec![
            band("<0.5", rated(RatedLevel::VeryBad)),
            band("[0.5, 1)", rated(RatedLevel::VeryBad)),
            band("1", rated(RatedLevel::Good)),
            band("(1, 1.5]", rated(RatedLevel::VeryGood)),
            band(">1.5", rated(RatedLevel::Excellent)),
        ],
        fallback: rated(RatedLevel::Unacceptable),
        missing: None,
    }
}

fn default_total_payment() -> BandTableConfig {
    BandTableConfig {
        bands: vec![
            band(">=0.5", rated(RatedLevel::VeryGood)),
            band("(0, 0.5)", rated(RatedLevel::Good)),
            band("0", rated(RatedLevel::Unacceptable)),
        ],
        fallback: rated(RatedLevel::Unacceptable),
        missing: None,
    }
}

fn default_count_table(overflow: PointRef) -> BandTableConfig {
    BandTableConfig {
        bands: vec![
            band("0", rated(RatedLevel::Excellent)),
            band("1-2", rated(RatedLevel::Bad)),
            band("3-5", rated(RatedLevel::VeryBad)),
            band(">5", overflow),
        ],
        fallback: overflow,
        missing: None,
    }
}

fn default_loan_status() -> CategoryTableConfig {
    CategoryTableConfig {
        match_kind: MatchKind::Contains,
        bands: vec![
            category(&["fully paid"], rated(RatedLevel::Excellent)),
            category(&["current"], rated(RatedLevel::Good)),
            category(&["in grace period"], rated(RatedLevel::Bad)),
            category(
                &["late (16-30 days)", "late (31-120 days)"],
                rated(RatedLevel::VeryBad),
            ),
            category(&["charged off"], rated(RatedLevel::Unacceptable)),
        ],
        fallback: rated(RatedLevel::Unacceptable),
        missing: None,
    }
}

fn default_home_ownership() -> CategoryTableConfig {
    CategoryTableConfig {
        match_kind: MatchKind::Suffix,
        bands: vec![
            category(&["own"], rated(RatedLevel::Excellent)),
            category(&["rent"], rated(RatedLevel::Good)),
            category(&["mortgage"], rated(RatedLevel::Bad)),
            category(&["any"], rated(RatedLevel::VeryBad)),
        ],
        fallback: rated(RatedLevel::Unacceptable),
        missing: Some(rated(RatedLevel::VeryBad)),
    }
}

fn default_credit_limit() -> BandTableConfig {
    BandTableConfig {
        bands: vec![
            band("<=0.1", rated(RatedLevel::Excellent)),
            band("(0.1, 0.2]", rated(RatedLevel::VeryGood)),
            band("(0.2, 0.3]", rated(RatedLevel::Good)),
            band("(0.3, 0.5]", rated(RatedLevel::Bad)),
            band("(0.5, 0.7]", rated(RatedLevel::VeryBad)),
            band(">0.7", rated(RatedLevel::Unacceptable)),
        ],
        fallback: rated(RatedLevel::Unacceptable),
        missing: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_config() {
        let config = RulesConfig::default();

        let points = config.rated_points.unwrap();
        assert_eq!(points.unacceptable, 0.0);
        assert_eq!(points.excellent, 800.0);

        let thresholds = config.grade_thresholds.unwrap();
        assert_eq!(thresholds.unacceptable, 750.0);
        assert_eq!(thresholds.very_good, 2500.0);

        let weights = config.weights.unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rules_config_serde_roundtrip() {
        let config = RulesConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: RulesConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_empty_rules_config_parse() {
        let config: RulesConfig = serde_saphyr::from_str("{}").unwrap();
        assert!(config.rated_points.is_none());
        assert!(config.criteria.is_none());
        assert_eq!(config.resolved(), RulesConfig::default());
    }

    #[test]
    fn test_partial_rules_config_parse() {
        let yaml = r#"
weights:
  payment_history: 0.5
  defaulters_history: 0.25
  financial_health: 0.25
"#;
        let config: RulesConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.weights.as_ref().unwrap().payment_history, 0.5);
        assert!(config.rated_points.is_none());

        let resolved = config.resolved();
        assert_eq!(resolved.rated_points, Some(RatedPoints::default()));
        assert_eq!(resolved.weights.unwrap().payment_history, 0.5);
    }

    #[test]
    fn test_incomplete_section_is_rejected() {
        let yaml = r#"
rated_points:
  unacceptable: 0
  very_bad: 100
"#;
        let result: Result<RulesConfig, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = r#"
weights:
  payment_history: 0.2
  defaulters_history: 0.45
  financial_health: 0.35
  loyalty: 0.1
"#;
        let result: Result<RulesConfig, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_criterion_override_parse() {
        let yaml = r#"
criteria:
  delinquency:
    bands:
      - { range: "0", points: excellent }
      - { range: ">0", points: grade.unacceptable }
    fallback: unacceptable
"#;
        let config: RulesConfig = serde_saphyr::from_str(yaml).unwrap();
        let criteria = config.criteria.unwrap();
        let delinquency = criteria.delinquency.as_ref().unwrap();
        assert_eq!(delinquency.bands.len(), 2);
        assert_eq!(
            delinquency.bands[1].points,
            PointRef::Threshold(ThresholdLevel::Unacceptable)
        );

        let resolved = criteria.resolved();
        assert_eq!(resolved.last_payment, CriteriaConfig::default().last_payment);
        assert_eq!(resolved.delinquency.unwrap().bands.len(), 2);
    }

    #[test]
    fn test_defaulter_overflow_constants_differ() {
        let criteria = CriteriaConfig::default();
        assert_eq!(
            criteria.delinquency.unwrap().fallback,
            PointRef::Threshold(ThresholdLevel::Unacceptable)
        );
        assert_eq!(
            criteria.public_records.unwrap().fallback,
            PointRef::Rated(RatedLevel::VeryBad)
        );
        assert_eq!(
            criteria.public_bankruptcies.unwrap().fallback,
            PointRef::Rated(RatedLevel::VeryBad)
        );
    }
}
