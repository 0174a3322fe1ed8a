use rayon::prelude::*;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::exclusion::{filter_included, ExcludedMemberSet};
use crate::records::{
    CustomerRecord, DefaulterDelinquencyRecord, DefaulterDetailRecord, LoanRecord,
    RepaymentRecord, ScoredAccount,
};
use crate::scoring::{calculate_score, Grade, MemberContext, RuleTable, ScoreResult};

/// The curated record sets for one run.
#[derive(Debug, Clone, Default)]
pub struct ScoringInputs {
    pub customers: Vec<CustomerRecord>,
    pub loans: Vec<LoanRecord>,
    pub repayments: Vec<RepaymentRecord>,
    pub delinquencies: Vec<DefaulterDelinquencyRecord>,
    pub details: Vec<DefaulterDetailRecord>,
    pub excluded: ExcludedMemberSet,
}

/// Which counterpart a loan account was missing when it was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingJoin {
    Repayment,
    Delinquency,
    Detail,
    Customer,
}

/// Counts for one run. Join drops are expected behaviour, not failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub loans_read: usize,
    pub excluded_records: usize,
    pub missing_repayment: usize,
    pub missing_delinquency: usize,
    pub missing_detail: usize,
    pub missing_customer: usize,
    pub duplicate_keys: usize,
    /// Loan rows repeating an earlier loan_id; each is still scored
    pub duplicate_loans: usize,
    pub scored: usize,
}

impl PipelineStats {
    fn record_missing(&mut self, missing: MissingJoin) {
        match missing {
            MissingJoin::Repayment => self.missing_repayment += 1,
            MissingJoin::Delinquency => self.missing_delinquency += 1,
            MissingJoin::Detail => self.missing_detail += 1,
            MissingJoin::Customer => self.missing_customer += 1,
        }
    }

    /// Loan accounts dropped by inner-join semantics
    pub fn join_drops(&self) -> usize {
        self.missing_repayment
            + self.missing_delinquency
            + self.missing_detail
            + self.missing_customer
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Sorted by member_id, then loan_id
    pub results: Vec<ScoreResult>,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    pub fn accounts(&self) -> Vec<&ScoredAccount> {
        self.results.iter().map(|r| &r.account).collect()
    }

    pub fn grade_counts(&self) -> BTreeMap<Grade, usize> {
        let mut counts: BTreeMap<Grade, usize> = Grade::ALL.iter().map(|g| (*g, 0)).collect();
        for result in &self.results {
            *counts.entry(result.account.loan_final_grade).or_default() += 1;
        }
        counts
    }

    pub fn results_for_member(&self, member_id: &str) -> Vec<&ScoreResult> {
        self.results
            .iter()
            .filter(|r| r.account.member_id == member_id)
            .collect()
    }
}

/// Rows plus a key -> row position map, built once per run.
/// The first row wins when a key repeats.
struct Lookup<'a, T> {
    rows: Vec<&'a T>,
    index: HashMap<&'a str, usize>,
    duplicates: usize,
}

impl<'a, T> Lookup<'a, T> {
    fn build<F>(rows: Vec<&'a T>, key: F) -> Self
    where
        F: Fn(&'a T) -> &'a str,
    {
        let mut index = HashMap::with_capacity(rows.len());
        let mut duplicates = 0;
        for (position, row) in rows.iter().enumerate() {
            match index.entry(key(*row)) {
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
                Entry::Occupied(_) => duplicates += 1,
            }
        }
        Self {
            rows,
            index,
            duplicates,
        }
    }

    fn get(&self, key: &str) -> Option<&'a T> {
        self.index.get(key).map(|&position| self.rows[position])
    }
}

struct Joins<'a> {
    repayments: Lookup<'a, RepaymentRecord>,
    delinquencies: Lookup<'a, DefaulterDelinquencyRecord>,
    details: Lookup<'a, DefaulterDetailRecord>,
    customers: Lookup<'a, CustomerRecord>,
}

impl<'a> Joins<'a> {
    /// Resolve a loan's counterparts in pipeline order:
    /// repayment, then defaulter records, then customer.
    fn resolve(&self, loan: &'a LoanRecord) -> Result<MemberContext<'a>, MissingJoin> {
        let repayment = self
            .repayments
            .get(&loan.loan_id)
            .ok_or(MissingJoin::Repayment)?;
        let delinquency = self
            .delinquencies
            .get(&loan.member_id)
            .ok_or(MissingJoin::Delinquency)?;
        let detail = self
            .details
            .get(&loan.member_id)
            .ok_or(MissingJoin::Detail)?;
        let customer = self
            .customers
            .get(&loan.member_id)
            .ok_or(MissingJoin::Customer)?;
        Ok(MemberContext {
            loan,
            repayment,
            delinquency,
            detail,
            customer,
        })
    }
}

enum Outcome {
    Scored(Box<ScoreResult>),
    Dropped(MissingJoin),
    Cancelled,
}

/// Runs the joins, evaluators and grading over a full record set.
///
/// Accounts are evaluated in parallel on the current rayon pool. Setting the
/// cancel flag stops evaluation of further accounts and the run returns
/// `PipelineError::Cancelled` with no output.
pub struct ScoringPipeline<'r> {
    rules: &'r RuleTable,
    cancel: Arc<AtomicBool>,
}

impl<'r> ScoringPipeline<'r> {
    pub fn new(rules: &'r RuleTable) -> Self {
        Self {
            rules,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; store `true` to cancel a run in progress.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self, inputs: &ScoringInputs) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        let mut stats = PipelineStats {
            loans_read: inputs.loans.len(),
            ..Default::default()
        };

        // 1) Excluded members leave every member-keyed input
        let (customers, dropped_customers) = filter_included(&inputs.customers, &inputs.excluded);
        let (loans, dropped_loans) = filter_included(&inputs.loans, &inputs.excluded);
        let (delinquencies, dropped_delinquencies) =
            filter_included(&inputs.delinquencies, &inputs.excluded);
        let (details, dropped_details) = filter_included(&inputs.details, &inputs.excluded);
        stats.excluded_records =
            dropped_customers + dropped_loans + dropped_delinquencies + dropped_details;
        debug!(
            customers = dropped_customers,
            loans = dropped_loans,
            delinquencies = dropped_delinquencies,
            details = dropped_details,
            "Removed records of excluded members"
        );

        let mut seen_loans = HashSet::with_capacity(loans.len());
        stats.duplicate_loans = loans
            .iter()
            .filter(|&&loan| !seen_loans.insert(loan.loan_id.as_str()))
            .count();
        if stats.duplicate_loans > 0 {
            warn!(
                count = stats.duplicate_loans,
                "Duplicate loan_id rows in loan file; each row is scored"
            );
        }

        // Repayments carry no member_id; an excluded member's repayments
        // never join because the loan they belong to is gone.
        let joins = Joins {
            repayments: Lookup::build(inputs.repayments.iter().collect(), |r| r.loan_id.as_str()),
            delinquencies: Lookup::build(delinquencies, |d| d.member_id.as_str()),
            details: Lookup::build(details, |d| d.member_id.as_str()),
            customers: Lookup::build(customers, |c| c.member_id.as_str()),
        };
        stats.duplicate_keys = joins.repayments.duplicates
            + joins.delinquencies.duplicates
            + joins.details.duplicates
            + joins.customers.duplicates;
        if stats.duplicate_keys > 0 {
            warn!(
                repayments = joins.repayments.duplicates,
                delinquencies = joins.delinquencies.duplicates,
                details = joins.details.duplicates,
                customers = joins.customers.duplicates,
                "Duplicate join keys in input; the first row for each key is used"
            );
        }

        // 2-10) Join, evaluate, aggregate and classify each loan account
        let outcomes: Vec<Outcome> = loans
            .par_iter()
            .map(|&loan| {
                if self.cancel.load(Ordering::Relaxed) {
                    return Outcome::Cancelled;
                }
                match joins.resolve(loan) {
                    Ok(ctx) => Outcome::Scored(Box::new(calculate_score(&ctx, self.rules))),
                    Err(missing) => Outcome::Dropped(missing),
                }
            })
            .collect();

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Outcome::Scored(result) => results.push(*result),
                Outcome::Dropped(missing) => stats.record_missing(missing),
                Outcome::Cancelled => {
                    warn!("Scoring run cancelled; discarding partial results");
                    return Err(PipelineError::Cancelled);
                }
            }
        }

        results.sort_by(|a, b| {
            a.account
                .member_id
                .cmp(&b.account.member_id)
                .then_with(|| a.account.loan_id.cmp(&b.account.loan_id))
                .then_with(|| a.account.loan_score.total_cmp(&b.account.loan_score))
        });
        stats.scored = results.len();

        debug!(
            missing_repayment = stats.missing_repayment,
            missing_delinquency = stats.missing_delinquency,
            missing_detail = stats.missing_detail,
            missing_customer = stats.missing_customer,
            "Dropped loan accounts without a join partner"
        );
        info!(
            scored = stats.scored,
            join_drops = stats.join_drops(),
            excluded_records = stats.excluded_records,
            elapsed = %humantime::format_duration(start.elapsed()),
            "Scoring pipeline finished"
        );

        Ok(PipelineOutput { results, stats })
    }
}

/// Score `inputs` with `rules` on the current rayon pool.
pub fn run_pipeline(
    inputs: &ScoringInputs,
    rules: &RuleTable,
) -> Result<PipelineOutput, PipelineError> {
    ScoringPipeline::new(rules).run(inputs)
}
