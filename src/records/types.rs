use serde::{Deserialize, Serialize};

use crate::scoring::Grade;

/// Records that belong to a member and can be filtered or joined on member_id.
pub trait MemberKeyed {
    fn member_id(&self) -> &str;
}

// Numeric cells that fail to parse ("NA", "n/a") are read as null rather
// than rejecting the row; every criterion has an explicit band for nulls.

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomerRecord {
    pub member_id: String,
    #[serde(default)]
    pub home_ownership: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub sub_grade: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_high_credit_limit: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub annual_income: Option<f64>,
    #[serde(default)]
    pub verification_status: Option<String>,
    #[serde(default)]
    pub emp_title: Option<String>,
    #[serde(default)]
    pub emp_length: Option<String>,
    #[serde(default)]
    pub address_state: Option<String>,
    #[serde(default)]
    pub application_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoanRecord {
    pub loan_id: String,
    pub member_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub loan_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub funded_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub monthly_installment: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub interest_rate: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub loan_term_years: Option<f64>,
    #[serde(default)]
    pub loan_status: Option<String>,
    #[serde(default)]
    pub loan_purpose: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepaymentRecord {
    pub loan_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub last_payment_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_payment_received: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_principal_received: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_interest_received: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_late_fee_received: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DefaulterDelinquencyRecord {
    pub member_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub delinq_2yrs: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub delinq_amnt: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub mths_since_last_delinq: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DefaulterDetailRecord {
    pub member_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pub_rec: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pub_rec_bankruptcies: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub inq_last_6mths: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExcludedMemberRecord {
    pub member_id: String,
}

impl MemberKeyed for CustomerRecord {
    fn member_id(&self) -> &str {
        &self.member_id
    }
}

impl MemberKeyed for LoanRecord {
    fn member_id(&self) -> &str {
        &self.member_id
    }
}

impl MemberKeyed for DefaulterDelinquencyRecord {
    fn member_id(&self) -> &str {
        &self.member_id
    }
}

impl MemberKeyed for DefaulterDetailRecord {
    fn member_id(&self) -> &str {
        &self.member_id
    }
}

/// One output row.
///
/// `loan_id` identifies which of a member's loans produced the row; it orders
/// output but is not written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAccount {
    pub member_id: String,
    #[serde(skip)]
    pub loan_id: String,
    pub payment_history_pts: f64,
    pub defaulters_history_pts: f64,
    pub financial_health_pts: f64,
    pub loan_score: f64,
    pub loan_final_grade: Grade,
}

impl ScoredAccount {
    pub const HEADER: [&'static str; 6] = [
        "member_id",
        "payment_history_pts",
        "defaulters_history_pts",
        "financial_health_pts",
        "loan_score",
        "loan_final_grade",
    ];
}
