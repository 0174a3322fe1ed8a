use super::config::{BandTableConfig, CategoryTableConfig, RulesConfig};
use super::factors::RangeOp;

/// Validate scoring rules at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_rules(config: &RulesConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref points) = config.rated_points {
        for (level, value) in points.entries() {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!(
                    "rules.rated_points.{}: must be a non-negative number",
                    level.name()
                ));
            }
        }
    }

    // Letter grades are bands between consecutive thresholds, so they must ascend
    if let Some(ref thresholds) = config.grade_thresholds {
        let entries = thresholds.entries();
        for (level, value) in entries {
            if !value.is_finite() {
                errors.push(format!(
                    "rules.grade_thresholds.{}: must be a finite number",
                    level.name()
                ));
            }
        }
        for pair in entries.windows(2) {
            let (lower_level, lower) = pair[0];
            let (upper_level, upper) = pair[1];
            if lower >= upper {
                errors.push(format!(
                    "rules.grade_thresholds: {} ({}) must be below {} ({})",
                    lower_level.name(),
                    lower,
                    upper_level.name(),
                    upper
                ));
            }
        }
    }

    if let Some(ref weights) = config.weights {
        let named = [
            ("payment_history", weights.payment_history),
            ("defaulters_history", weights.defaulters_history),
            ("financial_health", weights.financial_health),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("rules.weights.{}: must be a non-negative number", name));
            }
        }
    }

    if let Some(ref sub_grades) = config.sub_grades {
        if sub_grades.base.is_empty() {
            errors.push("rules.sub_grades.base: at least one grade letter is required".to_string());
        }
        for letter in sub_grades.base.keys() {
            let mut chars = letter.chars();
            let single_letter = matches!(
                (chars.next(), chars.next()),
                (Some(c), None) if c.is_ascii_alphabetic()
            );
            if !single_letter {
                errors.push(format!(
                    "rules.sub_grades.base.{}: key must be a single grade letter",
                    letter
                ));
            }
        }
        if sub_grades.multipliers.is_empty() {
            errors.push(
                "rules.sub_grades.multipliers: at least one sub-grade suffix is required"
                    .to_string(),
            );
        }
        for (suffix, factor) in &sub_grades.multipliers {
            if suffix.trim().is_empty() {
                errors.push("rules.sub_grades.multipliers: empty suffix".to_string());
            }
            if !factor.is_finite() || *factor < 0.0 {
                errors.push(format!(
                    "rules.sub_grades.multipliers.{}: must be a non-negative number",
                    suffix
                ));
            }
        }
    }

    if let Some(ref criteria) = config.criteria {
        let band_tables = [
            ("last_payment", &criteria.last_payment),
            ("total_payment", &criteria.total_payment),
            ("delinquency", &criteria.delinquency),
            ("public_records", &criteria.public_records),
            ("public_bankruptcies", &criteria.public_bankruptcies),
            ("inquiries", &criteria.inquiries),
            ("credit_limit", &criteria.credit_limit),
        ];
        for (name, table) in band_tables {
            if let Some(table) = table {
                validate_band_table(name, table, &mut errors);
            }
        }

        let category_tables = [
            ("loan_status", &criteria.loan_status),
            ("home_ownership", &criteria.home_ownership),
        ];
        for (name, table) in category_tables {
            if let Some(table) = table {
                validate_category_table(name, table, &mut errors);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_band_table(name: &str, table: &BandTableConfig, errors: &mut Vec<String>) {
    if table.bands.is_empty() {
        errors.push(format!("rules.criteria.{}.bands: must not be empty", name));
    }
    for (i, band) in table.bands.iter().enumerate() {
        if let Err(e) = RangeOp::parse(&band.range) {
            errors.push(format!(
                "rules.criteria.{}.bands[{}].range: invalid '{}' - {}",
                name, i, band.range, e
            ));
        }
    }
}

fn validate_category_table(name: &str, table: &CategoryTableConfig, errors: &mut Vec<String>) {
    if table.bands.is_empty() {
        errors.push(format!("rules.criteria.{}.bands: must not be empty", name));
    }
    for (i, band) in table.bands.iter().enumerate() {
        if band.patterns.is_empty() {
            errors.push(format!(
                "rules.criteria.{}.bands[{}].patterns: must not be empty",
                name, i
            ));
        }
        if band.patterns.iter().any(|p| p.trim().is_empty()) {
            errors.push(format!(
                "rules.criteria.{}.bands[{}].patterns: blank pattern",
                name, i
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{
        BandConfig, CriteriaConfig, GradeThresholds, PointRef, RatedPoints, SubGradeConfig,
        Weights,
    };

    fn empty_config() -> RulesConfig {
        RulesConfig {
            rated_points: None,
            grade_thresholds: None,
            weights: None,
            sub_grades: None,
            criteria: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_rules(&RulesConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_config() {
        assert!(validate_rules(&empty_config()).is_ok());
    }

    #[test]
    fn test_negative_rated_points() {
        let config = RulesConfig {
            rated_points: Some(RatedPoints {
                bad: -1.0,
                ..RatedPoints::default()
            }),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("rules.rated_points.bad"));
    }

    #[test]
    fn test_thresholds_must_ascend() {
        let config = RulesConfig {
            grade_thresholds: Some(GradeThresholds {
                good: 2600.0,
                ..GradeThresholds::default()
            }),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("good (2600) must be below very_good (2500)"));
    }

    #[test]
    fn test_invalid_weight() {
        let config = RulesConfig {
            weights: Some(Weights {
                financial_health: f64::NAN,
                ..Weights::default()
            }),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert!(errors[0].contains("rules.weights.financial_health"));
    }

    #[test]
    fn test_invalid_sub_grade_keys() {
        let mut sub_grades = SubGradeConfig::default();
        sub_grades.base.insert("AA".to_string(), crate::scoring::RatedLevel::Good);
        sub_grades.multipliers.insert("6".to_string(), -0.5);
        let config = RulesConfig {
            sub_grades: Some(sub_grades),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("rules.sub_grades.base.AA"));
        assert!(errors[1].contains("rules.sub_grades.multipliers.6"));
    }

    #[test]
    fn test_invalid_band_range() {
        let mut criteria = CriteriaConfig::default();
        if let Some(table) = criteria.delinquency.as_mut() {
            table.bands.push(BandConfig {
                range: "lots".to_string(),
                points: PointRef::UNACCEPTABLE,
            });
        }
        let config = RulesConfig {
            criteria: Some(criteria),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("rules.criteria.delinquency.bands[4].range"));
    }

    #[test]
    fn test_empty_category_patterns() {
        let mut criteria = CriteriaConfig::default();
        if let Some(table) = criteria.home_ownership.as_mut() {
            table.bands[0].patterns.clear();
        }
        let config = RulesConfig {
            criteria: Some(criteria),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert!(errors[0].contains("rules.criteria.home_ownership.bands[0].patterns"));
    }

    #[test]
    fn test_collects_all_errors() {
        let config = RulesConfig {
            rated_points: Some(RatedPoints {
                good: -5.0, // Error 1
                ..RatedPoints::default()
            }),
            weights: Some(Weights {
                payment_history: -0.1, // Error 2
                ..Weights::default()
            }),
            ..empty_config()
        };
        let errors = validate_rules(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
