use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::pipeline::{PipelineOutput, PipelineStats};
use crate::records::ScoredAccount;
use crate::scoring::Grade;

/// Delimited format for the scored accounts file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
}

impl OutputFormat {
    fn delimiter(self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }
}

/// Write the header row and one row per account to `writer`.
pub fn render_scored_accounts<W: Write>(
    writer: W,
    accounts: &[&ScoredAccount],
    format: OutputFormat,
) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(false)
        .from_writer(writer);

    // loan_id is skipped by serde, so the header is written explicitly
    csv_writer
        .write_record(ScoredAccount::HEADER)
        .context("Failed to write header row")?;
    for account in accounts {
        csv_writer
            .serialize(account)
            .with_context(|| format!("Failed to write row for member {}", account.member_id))?;
    }
    csv_writer.flush().context("Failed to flush scored accounts")?;
    Ok(())
}

/// Write scored accounts to `path` atomically; a failed run never leaves a
/// partial file behind.
pub fn write_scored_accounts(
    path: &Path,
    accounts: &[&ScoredAccount],
    format: OutputFormat,
) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    render_scored_accounts(&mut file, accounts, format)?;

    file.commit()
        .with_context(|| format!("Failed to save scored accounts to {}", path.display()))?;
    Ok(())
}

/// Machine-readable account of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub elapsed: String,
    pub stats: PipelineStats,
    pub grade_distribution: BTreeMap<Grade, usize>,
}

impl RunSummary {
    pub fn from_output(output: &PipelineOutput, elapsed: std::time::Duration) -> Self {
        Self {
            generated_at: Utc::now(),
            elapsed: humantime::format_duration(elapsed).to_string(),
            stats: output.stats.clone(),
            grade_distribution: output.grade_counts(),
        }
    }
}

pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, summary).context("Failed to serialize run summary")?;

    file.commit()
        .with_context(|| format!("Failed to save run summary to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account(member_id: &str, score: f64, grade: Grade) -> ScoredAccount {
        ScoredAccount {
            member_id: member_id.to_string(),
            loan_id: "hidden".to_string(),
            payment_history_pts: 230.0,
            defaulters_history_pts: 1440.0,
            financial_health_pts: 1120.0,
            loan_score: score,
            loan_final_grade: grade,
        }
    }

    #[test]
    fn test_render_csv_has_header_and_no_loan_id() {
        let a = account("m1", 2790.0, Grade::A);
        let mut buf = Vec::new();
        render_scored_accounts(&mut buf, &[&a], OutputFormat::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "member_id,payment_history_pts,defaulters_history_pts,\
             financial_health_pts,loan_score,loan_final_grade"
        );
        assert_eq!(lines[1], "m1,230.0,1440.0,1120.0,2790.0,A");
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_render_tsv_delimiter() {
        let a = account("m1", 2790.0, Grade::A);
        let mut buf = Vec::new();
        render_scored_accounts(&mut buf, &[&a], OutputFormat::Tsv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("m1\t230.0\t1440.0\t1120.0\t2790.0\tA"));
    }

    #[test]
    fn test_render_empty_writes_header_only() {
        let mut buf = Vec::new();
        render_scored_accounts(&mut buf, &[], OutputFormat::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_write_scored_accounts_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "stale").unwrap();

        let a = account("m1", 2790.0, Grade::A);
        write_scored_accounts(&path, &[&a], OutputFormat::Csv).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("member_id,"));
        assert!(!text.contains("stale"));
    }

    #[test]
    fn test_write_run_summary_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let summary = RunSummary {
            generated_at: Utc::now(),
            elapsed: "1s".to_string(),
            stats: PipelineStats {
                loans_read: 3,
                scored: 2,
                missing_customer: 1,
                ..Default::default()
            },
            grade_distribution: [(Grade::A, 1), (Grade::F, 1)].into_iter().collect(),
        };
        write_run_summary(&path, &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["stats"]["scored"], 2);
        assert_eq!(value["stats"]["missing_customer"], 1);
        assert_eq!(value["grade_distribution"]["A"], 1);
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_output_format_from_yaml() {
        let format: OutputFormat = serde_saphyr::from_str("tsv").unwrap();
        assert_eq!(format, OutputFormat::Tsv);
    }
}
