use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::output::OutputFormat;
use crate::records::InputPaths;
use crate::scoring::{RuleTable, RulesConfig};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<InputConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RulesConfig>,
}

impl Config {
    /// The configuration `init` writes: every rule section spelled out.
    pub fn starter() -> Self {
        Self {
            inputs: Some(InputConfig {
                dir: Some(PathBuf::from("data")),
                ..Default::default()
            }),
            output: None,
            rules: Some(RulesConfig::default()),
        }
    }

    /// Rules with every omitted section filled from the defaults.
    pub fn effective_rules(&self) -> RulesConfig {
        self.rules.clone().unwrap_or_default().resolved()
    }

    /// Validate and compile the rules.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        RuleTable::from_config(&self.rules.clone().unwrap_or_default())
    }
}

/// Input locations. `dir` supplies standard file names; any per-file entry
/// overrides the file inside `dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loans: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repayments: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delinquencies: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded: Option<PathBuf>,
}

impl InputConfig {
    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merged_with(&self, other: &InputConfig) -> InputConfig {
        InputConfig {
            dir: other.dir.clone().or_else(|| self.dir.clone()),
            customers: other.customers.clone().or_else(|| self.customers.clone()),
            loans: other.loans.clone().or_else(|| self.loans.clone()),
            repayments: other.repayments.clone().or_else(|| self.repayments.clone()),
            delinquencies: other
                .delinquencies
                .clone()
                .or_else(|| self.delinquencies.clone()),
            details: other.details.clone().or_else(|| self.details.clone()),
            excluded: other.excluded.clone().or_else(|| self.excluded.clone()),
        }
    }

    /// Anchor relative paths at `base` (the config file's directory).
    pub fn rebased(&self, base: &Path) -> InputConfig {
        let anchor = |path: &Option<PathBuf>| {
            path.as_ref().map(|p| if p.is_relative() { base.join(p) } else { p.clone() })
        };
        InputConfig {
            dir: anchor(&self.dir),
            customers: anchor(&self.customers),
            loans: anchor(&self.loans),
            repayments: anchor(&self.repayments),
            delinquencies: anchor(&self.delinquencies),
            details: anchor(&self.details),
            excluded: anchor(&self.excluded),
        }
    }

    /// Resolve to concrete paths.
    ///
    /// Returns the names of required inputs that have neither a path nor a `dir`.
    pub fn resolve(&self) -> Result<InputPaths, Vec<&'static str>> {
        let defaults = self.dir.as_deref().map(InputPaths::in_dir);

        let mut missing = Vec::new();
        let mut pick = |name: &'static str,
                        explicit: &Option<PathBuf>,
                        standard: Option<&PathBuf>|
         -> PathBuf {
            match (explicit, standard) {
                (Some(path), _) => path.clone(),
                (None, Some(path)) => path.clone(),
                (None, None) => {
                    missing.push(name);
                    PathBuf::new()
                }
            }
        };

        let paths = InputPaths {
            customers: pick("customers", &self.customers, defaults.as_ref().map(|d| &d.customers)),
            loans: pick("loans", &self.loans, defaults.as_ref().map(|d| &d.loans)),
            repayments: pick(
                "repayments",
                &self.repayments,
                defaults.as_ref().map(|d| &d.repayments),
            ),
            delinquencies: pick(
                "delinquencies",
                &self.delinquencies,
                defaults.as_ref().map(|d| &d.delinquencies),
            ),
            details: pick("details", &self.details, defaults.as_ref().map(|d| &d.details)),
            // Optional: without a path or a dir nobody is excluded
            excluded: self
                .excluded
                .clone()
                .or_else(|| defaults.as_ref().and_then(|d| d.excluded.clone())),
        };

        if missing.is_empty() {
            Ok(paths)
        } else {
            Err(missing)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CUSTOMERS_FILE, EXCLUDED_FILE};
    use crate::scoring::Weights;

    #[test]
    fn test_empty_config_parses() {
        let config: Config = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.rule_table().is_ok());
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let result: Result<Config, _> = serde_saphyr::from_str("queries: []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_rules_override() {
        let yaml = r#"
rules:
  weights:
    payment_history: 0.5
    defaulters_history: 0.25
    financial_health: 0.25
"#;
        let config: Config = serde_saphyr::from_str(yaml).unwrap();
        let rules = config.effective_rules();
        assert_eq!(rules.weights.unwrap().payment_history, 0.5);
        assert!(rules.rated_points.is_some());
        assert!(rules.criteria.unwrap().delinquency.is_some());

        let table = config.rule_table().unwrap();
        assert_eq!(table.weights.payment_history, 0.5);
    }

    #[test]
    fn test_incomplete_section_rejected() {
        let yaml = "rules:\n  weights:\n    payment_history: 0.5\n";
        let result: Result<Config, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_rules_reported() {
        let config = Config {
            rules: Some(RulesConfig {
                weights: Some(Weights {
                    payment_history: -1.0,
                    ..Weights::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(config.rule_table(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_input_resolve_from_dir() {
        let inputs = InputConfig {
            dir: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        let paths = inputs.resolve().unwrap();
        assert_eq!(paths.customers, Path::new("/data").join(CUSTOMERS_FILE));
        assert_eq!(paths.excluded, Some(Path::new("/data").join(EXCLUDED_FILE)));
    }

    #[test]
    fn test_input_resolve_override_and_base() {
        let inputs = InputConfig {
            dir: Some(PathBuf::from("data")),
            loans: Some(PathBuf::from("/elsewhere/loans.csv")),
            ..Default::default()
        };
        let paths = inputs.rebased(Path::new("/cfg")).resolve().unwrap();
        assert_eq!(paths.loans, PathBuf::from("/elsewhere/loans.csv"));
        assert_eq!(paths.customers, Path::new("/cfg/data").join(CUSTOMERS_FILE));
    }

    #[test]
    fn test_input_resolve_reports_missing() {
        let inputs = InputConfig {
            customers: Some(PathBuf::from("c.csv")),
            ..Default::default()
        };
        let missing = inputs.resolve().unwrap_err();
        assert_eq!(missing, vec!["loans", "repayments", "delinquencies", "details"]);
    }

    #[test]
    fn test_explicit_inputs_without_dir_exclude_nobody() {
        let dir = tempfile::TempDir::new().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            Some(path)
        };
        let inputs = InputConfig {
            customers: write(
                "c.csv",
                "member_id,home_ownership,grade,sub_grade,total_high_credit_limit\n\
                 m1,OWN,A,A1,100\n",
            ),
            loans: write(
                "l.csv",
                "loan_id,member_id,funded_amount,monthly_installment,loan_status\n\
                 l1,m1,10,1,Current\n",
            ),
            repayments: write(
                "r.csv",
                "loan_id,last_payment_amount,total_payment_received\nl1,1,5\n",
            ),
            delinquencies: write("d.csv", "member_id,delinq_2yrs\nm1,0\n"),
            details: write(
                "x.csv",
                "member_id,pub_rec,pub_rec_bankruptcies,inq_last_6mths\nm1,0,0,0\n",
            ),
            ..Default::default()
        };
        // A standard-named file next to the inputs must not be picked up
        write(EXCLUDED_FILE, "member_id\nm1\n");

        let paths = inputs.resolve().unwrap();
        assert_eq!(paths.excluded, None);

        let loaded = crate::records::load_inputs(&paths).unwrap();
        assert!(loaded.excluded.is_empty());
        assert_eq!(loaded.loans.len(), 1);
    }

    #[test]
    fn test_merged_with_prefers_other() {
        let file = InputConfig {
            dir: Some(PathBuf::from("a")),
            loans: Some(PathBuf::from("a/loans.csv")),
            ..Default::default()
        };
        let cli = InputConfig {
            dir: Some(PathBuf::from("b")),
            ..Default::default()
        };
        let merged = file.merged_with(&cli);
        assert_eq!(merged.dir, Some(PathBuf::from("b")));
        assert_eq!(merged.loans, Some(PathBuf::from("a/loans.csv")));
    }
}
