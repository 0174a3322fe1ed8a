//! CSV ingest for the curated record sets.
//!
//! Files are produced by the upstream cleaning stage, so ingest is strict
//! about structure and lenient about values:
//! - **Required columns** must be present in the header (error names them all)
//! - **Malformed rows** abort the load with file and line
//! - **Unparseable numeric cells** are read as null and banded as such
//! - Extra columns are ignored

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::{
    CustomerRecord, DefaulterDelinquencyRecord, DefaulterDetailRecord, ExcludedMemberRecord,
    LoanRecord, RepaymentRecord,
};
use crate::exclusion::ExcludedMemberSet;
use crate::pipeline::ScoringInputs;

/// A record type that can be read from one of the input files.
pub trait CsvRecord: DeserializeOwned {
    /// Human-readable name used in errors and logs
    const KIND: &'static str;
    const REQUIRED_COLUMNS: &'static [&'static str];
}

impl CsvRecord for CustomerRecord {
    const KIND: &'static str = "customer";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "member_id",
        "home_ownership",
        "grade",
        "sub_grade",
        "total_high_credit_limit",
    ];
}

impl CsvRecord for LoanRecord {
    const KIND: &'static str = "loan";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "loan_id",
        "member_id",
        "funded_amount",
        "monthly_installment",
        "loan_status",
    ];
}

impl CsvRecord for RepaymentRecord {
    const KIND: &'static str = "repayment";
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["loan_id", "last_payment_amount", "total_payment_received"];
}

impl CsvRecord for DefaulterDelinquencyRecord {
    const KIND: &'static str = "defaulter delinquency";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["member_id", "delinq_2yrs"];
}

impl CsvRecord for DefaulterDetailRecord {
    const KIND: &'static str = "defaulter detail";
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["member_id", "pub_rec", "pub_rec_bankruptcies", "inq_last_6mths"];
}

impl CsvRecord for ExcludedMemberRecord {
    const KIND: &'static str = "excluded member";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["member_id"];
}

/// Standard file names inside an input directory.
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const LOANS_FILE: &str = "loans.csv";
pub const REPAYMENTS_FILE: &str = "repayments.csv";
pub const DELINQUENCIES_FILE: &str = "defaulters_delinq.csv";
pub const DETAILS_FILE: &str = "defaulters_detail.csv";
pub const EXCLUDED_FILE: &str = "excluded_members.csv";

/// Resolved locations of the six input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub customers: PathBuf,
    pub loans: PathBuf,
    pub repayments: PathBuf,
    pub delinquencies: PathBuf,
    pub details: PathBuf,
    /// None, or a path that does not exist, means nothing is excluded
    pub excluded: Option<PathBuf>,
}

impl InputPaths {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            customers: dir.join(CUSTOMERS_FILE),
            loans: dir.join(LOANS_FILE),
            repayments: dir.join(REPAYMENTS_FILE),
            delinquencies: dir.join(DELINQUENCIES_FILE),
            details: dir.join(DETAILS_FILE),
            excluded: Some(dir.join(EXCLUDED_FILE)),
        }
    }
}

/// Read every input file into memory.
pub fn load_inputs(paths: &InputPaths) -> Result<ScoringInputs> {
    let customers = read_records_file::<CustomerRecord>(&paths.customers)?;
    let loans = read_records_file::<LoanRecord>(&paths.loans)?;
    let repayments = read_records_file::<RepaymentRecord>(&paths.repayments)?;
    let delinquencies = read_records_file::<DefaulterDelinquencyRecord>(&paths.delinquencies)?;
    let details = read_records_file::<DefaulterDetailRecord>(&paths.details)?;
    let excluded = match &paths.excluded {
        Some(path) => load_excluded_members(path)?,
        None => ExcludedMemberSet::new(),
    };

    info!(
        customers = customers.len(),
        loans = loans.len(),
        repayments = repayments.len(),
        delinquencies = delinquencies.len(),
        details = details.len(),
        excluded = excluded.len(),
        "Loaded input record sets"
    );

    Ok(ScoringInputs {
        customers,
        loans,
        repayments,
        delinquencies,
        details,
        excluded,
    })
}

/// Load the excluded member set. A missing file yields an empty set.
pub fn load_excluded_members(path: &Path) -> Result<ExcludedMemberSet> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Excluded member file not found; no members will be excluded"
        );
        return Ok(ExcludedMemberSet::new());
    }
    let records = read_records_file::<ExcludedMemberRecord>(path)?;
    Ok(records.into_iter().map(|r| r.member_id).collect())
}

pub fn read_records_file<T: CsvRecord>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file at {}", T::KIND, path.display()))?;
    let records = read_records(file)
        .with_context(|| format!("Failed to read {} records from {}", T::KIND, path.display()))?;
    debug!(kind = T::KIND, rows = records.len(), path = %path.display(), "Read records");
    Ok(records)
}

/// Parse CSV from any reader. Blank key cells are rejected.
pub fn read_records<T: CsvRecord, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    ensure_required_columns_exist::<T>(&headers)?;
    let key_columns: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| *name == "member_id" || *name == "loan_id")
        .map(|(idx, _)| idx)
        .collect();

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based
        let line = idx + 2;
        let row = result.with_context(|| format!("CSV parse error on line {}", line))?;
        let blank_key = key_columns
            .iter()
            .find(|&&col| row.get(col).map_or(true, str::is_empty));
        if let Some(col) = blank_key {
            bail!("Line {}: empty key column '{}'", line, &headers[*col]);
        }
        let record: T = row
            .deserialize(Some(&headers))
            .with_context(|| format!("Invalid {} record on line {}", T::KIND, line))?;
        records.push(record);
    }
    Ok(records)
}

fn ensure_required_columns_exist<T: CsvRecord>(headers: &StringRecord) -> Result<()> {
    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<&str> = T::REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !present.contains(col))
        .collect();
    if !missing.is_empty() {
        bail!(
            "Missing required {} column(s): {}",
            T::KIND,
            missing.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_customers() {
        let csv = "\
member_id,home_ownership,grade,sub_grade,total_high_credit_limit,annual_income,extra
m1,OWN,A,A1,20000,85000,ignored
m2,RENT,C,C3,,n/a,ignored
";
        let records: Vec<CustomerRecord> = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].member_id, "m1");
        assert_eq!(records[0].home_ownership.as_deref(), Some("OWN"));
        assert_eq!(records[0].total_high_credit_limit, Some(20000.0));
        assert_eq!(records[1].total_high_credit_limit, None);
        assert_eq!(records[1].annual_income, None);
    }

    #[test]
    fn test_unparseable_number_reads_as_null() {
        let csv = "\
member_id,delinq_2yrs
m1,NA
m2, 3
";
        let records: Vec<DefaulterDelinquencyRecord> = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].delinq_2yrs, None);
        assert_eq!(records[1].delinq_2yrs, Some(3.0));
    }

    #[test]
    fn test_missing_required_columns() {
        let csv = "loan_id,member_id\nl1,m1\n";
        let err = read_records::<LoanRecord, _>(csv.as_bytes()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Missing required loan column(s)"));
        assert!(message.contains("funded_amount"));
        assert!(message.contains("monthly_installment"));
        assert!(message.contains("loan_status"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let csv = "\
loan_id,last_payment_amount,total_payment_received
l1,300,1000
,300,1000
";
        let err = read_records::<RepaymentRecord, _>(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Line 3: empty key column 'loan_id'"));
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let csv = "member_id,delinq_2yrs\nm1,0,extra\n";
        let err = read_records::<DefaulterDelinquencyRecord, _>(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_excluded_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = load_excluded_members(&dir.path().join("none.csv")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_excluded_members() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXCLUDED_FILE);
        std::fs::write(&path, "member_id\nm1\nm2\nm1\n").unwrap();

        let set = load_excluded_members(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.is_excluded("m1"));
        assert!(!set.is_excluded("m3"));
    }

    #[test]
    fn test_missing_input_file_names_kind() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InputPaths::in_dir(dir.path());
        let err = load_inputs(&paths).unwrap_err();
        assert!(err.to_string().contains("Failed to open customer file"));
    }
}
