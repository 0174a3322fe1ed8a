use super::config::Weights;
use super::grade::classify;
use super::rules::RuleTable;
use crate::records::{
    CustomerRecord, DefaulterDelinquencyRecord, DefaulterDetailRecord, LoanRecord,
    RepaymentRecord, ScoredAccount,
};

/// Point values produced by one criterion, summed before weighting.
pub trait CriterionPoints {
    /// Label used in breakdowns, e.g. "Payment history"
    const LABEL: &'static str;

    fn entries(&self) -> Vec<(&'static str, f64)>;

    fn total(&self) -> f64 {
        self.entries().iter().map(|(_, points)| points).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaymentHistoryPoints {
    pub last_payment_pts: f64,
    pub total_payment_pts: f64,
}

impl CriterionPoints for PaymentHistoryPoints {
    const LABEL: &'static str = "Payment history";

    fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("last_payment_pts", self.last_payment_pts),
            ("total_payment_pts", self.total_payment_pts),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DefaulterHistoryPoints {
    pub delinq_pts: f64,
    pub public_records_pts: f64,
    pub public_bankruptcies_pts: f64,
    pub enq_pts: f64,
}

impl CriterionPoints for DefaulterHistoryPoints {
    const LABEL: &'static str = "Defaulter history";

    fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("delinq_pts", self.delinq_pts),
            ("public_records_pts", self.public_records_pts),
            ("public_bankruptcies_pts", self.public_bankruptcies_pts),
            ("enq_pts", self.enq_pts),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FinancialHealthPoints {
    pub loan_status_pts: f64,
    pub home_pts: f64,
    pub credit_limit_pts: f64,
    pub grade_pts: f64,
}

impl CriterionPoints for FinancialHealthPoints {
    const LABEL: &'static str = "Financial health";

    fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("loan_status_pts", self.loan_status_pts),
            ("home_pts", self.home_pts),
            ("credit_limit_pts", self.credit_limit_pts),
            ("grade_pts", self.grade_pts),
        ]
    }
}

/// Every record joined for one loan account.
#[derive(Debug, Clone, Copy)]
pub struct MemberContext<'a> {
    pub loan: &'a LoanRecord,
    pub repayment: &'a RepaymentRecord,
    pub delinquency: &'a DefaulterDelinquencyRecord,
    pub detail: &'a DefaulterDetailRecord,
    pub customer: &'a CustomerRecord,
}

/// Weighted criterion scores and their sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeScore {
    pub payment_history_pts: f64,
    pub defaulters_history_pts: f64,
    pub financial_health_pts: f64,
    pub loan_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub payment_history: PaymentHistoryPoints,
    pub defaulter_history: DefaulterHistoryPoints,
    pub financial_health: FinancialHealthPoints,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub account: ScoredAccount,
    pub breakdown: ScoreBreakdown,
}

pub fn evaluate_payment_history(
    loan: &LoanRecord,
    repayment: &RepaymentRecord,
    rules: &RuleTable,
) -> PaymentHistoryPoints {
    let tables = &rules.criteria;
    let last_payment = tables
        .last_payment
        .lookup_scaled(repayment.last_payment_amount, loan.monthly_installment);
    let total_payment = tables
        .total_payment
        .lookup_scaled(repayment.total_payment_received, loan.funded_amount);

    PaymentHistoryPoints {
        last_payment_pts: rules.points(last_payment),
        total_payment_pts: rules.points(total_payment),
    }
}

pub fn evaluate_defaulter_history(
    delinquency: &DefaulterDelinquencyRecord,
    detail: &DefaulterDetailRecord,
    rules: &RuleTable,
) -> DefaulterHistoryPoints {
    let tables = &rules.criteria;
    DefaulterHistoryPoints {
        delinq_pts: rules.points(tables.delinquency.lookup(delinquency.delinq_2yrs)),
        public_records_pts: rules.points(tables.public_records.lookup(detail.pub_rec)),
        public_bankruptcies_pts: rules
            .points(tables.public_bankruptcies.lookup(detail.pub_rec_bankruptcies)),
        enq_pts: rules.points(tables.inquiries.lookup(detail.inq_last_6mths)),
    }
}

pub fn evaluate_financial_health(
    loan: &LoanRecord,
    customer: &CustomerRecord,
    rules: &RuleTable,
) -> FinancialHealthPoints {
    let tables = &rules.criteria;
    let loan_status = tables.loan_status.lookup(loan.loan_status.as_deref());
    let home = tables.home_ownership.lookup(customer.home_ownership.as_deref());
    let credit_limit = tables
        .credit_limit
        .lookup_scaled(loan.funded_amount, customer.total_high_credit_limit);

    FinancialHealthPoints {
        loan_status_pts: rules.points(loan_status),
        home_pts: rules.points(home),
        credit_limit_pts: rules.points(credit_limit),
        grade_pts: rules.sub_grades.points(
            customer.grade.as_deref(),
            customer.sub_grade.as_deref(),
            &rules.rated_points,
        ),
    }
}

/// Weighted sum of the three criteria. No rounding.
pub fn aggregate(
    payment_history: &PaymentHistoryPoints,
    defaulter_history: &DefaulterHistoryPoints,
    financial_health: &FinancialHealthPoints,
    weights: &Weights,
) -> CompositeScore {
    let payment_history_pts = payment_history.total() * weights.payment_history;
    let defaulters_history_pts = defaulter_history.total() * weights.defaulters_history;
    let financial_health_pts = financial_health.total() * weights.financial_health;

    CompositeScore {
        payment_history_pts,
        defaulters_history_pts,
        financial_health_pts,
        loan_score: payment_history_pts + defaulters_history_pts + financial_health_pts,
    }
}

/// Score and grade one joined loan account.
pub fn calculate_score(ctx: &MemberContext<'_>, rules: &RuleTable) -> ScoreResult {
    let payment_history = evaluate_payment_history(ctx.loan, ctx.repayment, rules);
    let defaulter_history = evaluate_defaulter_history(ctx.delinquency, ctx.detail, rules);
    let financial_health = evaluate_financial_health(ctx.loan, ctx.customer, rules);

    let composite = aggregate(
        &payment_history,
        &defaulter_history,
        &financial_health,
        &rules.weights,
    );

    ScoreResult {
        account: ScoredAccount {
            member_id: ctx.loan.member_id.clone(),
            loan_id: ctx.loan.loan_id.clone(),
            payment_history_pts: composite.payment_history_pts,
            defaulters_history_pts: composite.defaulters_history_pts,
            financial_health_pts: composite.financial_health_pts,
            loan_score: composite.loan_score,
            loan_final_grade: classify(composite.loan_score, &rules.grade_thresholds),
        },
        breakdown: ScoreBreakdown {
            payment_history,
            defaulter_history,
            financial_health,
        },
    }
}
