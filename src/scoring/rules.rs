use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::config::{
    BandTableConfig, CategoryTableConfig, GradeThresholds, RatedPoints, RulesConfig,
    SubGradeConfig, Weights,
};
use super::factors::{MatchKind, PointRef, RangeOp, RatedLevel};
use super::validation::validate_rules;
use crate::error::ConfigError;

/// First band whose predicate holds, in declaration order.
pub fn first_match<T>(bands: &[(T, PointRef)], predicate: impl Fn(&T) -> bool) -> Option<PointRef> {
    bands
        .iter()
        .find(|(band, _)| predicate(band))
        .map(|(_, points)| *points)
}

/// Compiled numeric band table.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    bands: Vec<(RangeOp, PointRef)>,
    fallback: PointRef,
    missing: PointRef,
}

impl BandTable {
    pub fn compile(config: &BandTableConfig) -> Result<Self> {
        let bands = config
            .bands
            .iter()
            .map(|band| Ok((RangeOp::parse(&band.range)?, band.points)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            bands,
            fallback: config.fallback,
            missing: config.missing.unwrap_or(config.fallback),
        })
    }

    pub fn lookup(&self, value: Option<f64>) -> PointRef {
        match value.filter(|v| !v.is_nan()) {
            None => self.missing,
            Some(v) => first_match(&self.bands, |range| range.matches(v)).unwrap_or(self.fallback),
        }
    }

    /// Lookup with band bounds expressed as fractions of `reference`.
    ///
    /// A zero reference leaves the ratio undefined and is treated as missing.
    pub fn lookup_scaled(&self, value: Option<f64>, reference: Option<f64>) -> PointRef {
        let value = value.filter(|v| !v.is_nan());
        let reference = reference.filter(|r| !r.is_nan() && *r != 0.0);
        match (value, reference) {
            (Some(v), Some(r)) => first_match(&self.bands, |range| range.scaled(r).matches(v))
                .unwrap_or(self.fallback),
            _ => self.missing,
        }
    }
}

/// Compiled text band table. Patterns are stored lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    match_kind: MatchKind,
    bands: Vec<(Vec<String>, PointRef)>,
    fallback: PointRef,
    missing: PointRef,
}

impl CategoryTable {
    pub fn compile(config: &CategoryTableConfig) -> Self {
        let bands = config
            .bands
            .iter()
            .map(|band| {
                let patterns = band.patterns.iter().map(|p| p.trim().to_lowercase()).collect();
                (patterns, band.points)
            })
            .collect();
        Self {
            match_kind: config.match_kind,
            bands,
            fallback: config.fallback,
            missing: config.missing.unwrap_or(config.fallback),
        }
    }

    /// Blank values count as missing. Unrecognized values get `fallback`.
    pub fn lookup(&self, value: Option<&str>) -> PointRef {
        let value = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v.to_lowercase(),
            None => return self.missing,
        };
        first_match(&self.bands, |patterns| {
            patterns.iter().any(|p| self.match_kind.matches(&value, p))
        })
        .unwrap_or(self.fallback)
    }
}

/// Grade letter base levels and sub-grade multipliers.
#[derive(Debug, Clone, PartialEq)]
pub struct SubGradeTable {
    base: HashMap<char, RatedLevel>,
    multipliers: HashMap<String, f64>,
}

impl SubGradeTable {
    pub fn compile(config: &SubGradeConfig) -> Self {
        let base = config
            .base
            .iter()
            .filter_map(|(letter, level)| {
                letter
                    .trim()
                    .chars()
                    .next()
                    .map(|c| (c.to_ascii_uppercase(), *level))
            })
            .collect();
        let multipliers = config
            .multipliers
            .iter()
            .map(|(suffix, factor)| (suffix.trim().to_uppercase(), *factor))
            .collect();
        Self { base, multipliers }
    }

    /// Points for a grade / sub-grade pair, e.g. ("B", "B3") -> very_good x 0.90.
    ///
    /// The sub-grade must belong to the grade letter. Unknown letters,
    /// unknown suffixes and mismatches score unacceptable, as does any grade
    /// whose base level is itself unacceptable (regardless of suffix).
    pub fn points(&self, grade: Option<&str>, sub_grade: Option<&str>, rated: &RatedPoints) -> f64 {
        let unacceptable = rated.get(RatedLevel::Unacceptable);

        let Some(letter) = grade
            .map(str::trim)
            .and_then(|g| g.chars().next())
            .map(|c| c.to_ascii_uppercase())
        else {
            return unacceptable;
        };
        let Some(level) = self.base.get(&letter).copied() else {
            return unacceptable;
        };
        if level == RatedLevel::Unacceptable {
            return unacceptable;
        }

        let Some(sub_grade) = sub_grade.map(|s| s.trim().to_uppercase()) else {
            return unacceptable;
        };
        let Some(suffix) = sub_grade.strip_prefix(letter) else {
            return unacceptable;
        };
        match self.multipliers.get(suffix) {
            Some(factor) => rated.get(level) * factor,
            None => unacceptable,
        }
    }
}

/// Band tables for every criterion, compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaTables {
    pub last_payment: BandTable,
    pub total_payment: BandTable,
    pub delinquency: BandTable,
    pub public_records: BandTable,
    pub public_bankruptcies: BandTable,
    pub inquiries: BandTable,
    pub loan_status: CategoryTable,
    pub home_ownership: CategoryTable,
    pub credit_limit: BandTable,
}

/// Immutable rule set for one scoring run, shared by reference across workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    pub rated_points: RatedPoints,
    pub grade_thresholds: GradeThresholds,
    pub weights: Weights,
    pub sub_grades: SubGradeTable,
    pub criteria: CriteriaTables,
}

impl RuleTable {
    /// Validate and compile rules, filling omitted sections with defaults.
    pub fn from_config(config: &RulesConfig) -> Result<Self, ConfigError> {
        validate_rules(config).map_err(ConfigError::Invalid)?;
        let resolved = config.resolved();

        let rated_points = resolved.rated_points.unwrap_or_default();
        let grade_thresholds = resolved.grade_thresholds.unwrap_or_default();
        let weights = resolved.weights.unwrap_or_default();
        let sub_grades = SubGradeTable::compile(&resolved.sub_grades.unwrap_or_default());
        let criteria = resolved.criteria.unwrap_or_default();

        let mut errors = Vec::new();
        let mut band = |name: &str, table: Option<BandTableConfig>| -> Option<BandTable> {
            let table = table?;
            match BandTable::compile(&table) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    errors.push(format!("rules.criteria.{}: {}", name, e));
                    None
                }
            }
        };

        let last_payment = band("last_payment", criteria.last_payment);
        let total_payment = band("total_payment", criteria.total_payment);
        let delinquency = band("delinquency", criteria.delinquency);
        let public_records = band("public_records", criteria.public_records);
        let public_bankruptcies = band("public_bankruptcies", criteria.public_bankruptcies);
        let inquiries = band("inquiries", criteria.inquiries);
        let credit_limit = band("credit_limit", criteria.credit_limit);

        let (
            Some(last_payment),
            Some(total_payment),
            Some(delinquency),
            Some(public_records),
            Some(public_bankruptcies),
            Some(inquiries),
            Some(credit_limit),
            Some(loan_status),
            Some(home_ownership),
        ) = (
            last_payment,
            total_payment,
            delinquency,
            public_records,
            public_bankruptcies,
            inquiries,
            credit_limit,
            criteria.loan_status.as_ref().map(CategoryTable::compile),
            criteria.home_ownership.as_ref().map(CategoryTable::compile),
        )
        else {
            if errors.is_empty() {
                errors.push("rules.criteria: a criterion table is missing".to_string());
            }
            return Err(ConfigError::Invalid(errors));
        };

        if (weights.sum() - 1.0).abs() > 1e-6 {
            warn!(
                sum = weights.sum(),
                "Criterion weights do not sum to 1; scores will not be on the grade threshold scale"
            );
        }

        debug!(
            payment_history = weights.payment_history,
            defaulters_history = weights.defaulters_history,
            financial_health = weights.financial_health,
            "Compiled rule table"
        );

        Ok(Self {
            rated_points,
            grade_thresholds,
            weights,
            sub_grades,
            criteria: CriteriaTables {
                last_payment,
                total_payment,
                delinquency,
                public_records,
                public_bankruptcies,
                inquiries,
                loan_status,
                home_ownership,
                credit_limit,
            },
        })
    }

    /// Resolve a point reference against this table's constants.
    pub fn points(&self, point: PointRef) -> f64 {
        match point {
            PointRef::Rated(level) => self.rated_points.get(level),
            PointRef::Threshold(level) => self.grade_thresholds.get(level),
        }
    }
}
