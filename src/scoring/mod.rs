pub mod config;
pub mod engine;
pub mod factors;
pub mod grade;
pub mod rules;
pub mod validation;

pub use config::*;
pub use engine::{
    aggregate, calculate_score, evaluate_defaulter_history, evaluate_financial_health,
    evaluate_payment_history, CompositeScore, CriterionPoints, DefaulterHistoryPoints,
    FinancialHealthPoints, MemberContext, PaymentHistoryPoints, ScoreBreakdown, ScoreResult,
};
pub use factors::{MatchKind, PointRef, RangeOp, RatedLevel, ThresholdLevel};
pub use grade::{classify, Grade};
pub use rules::{BandTable, CategoryTable, CriteriaTables, RuleTable, SubGradeTable};
pub use validation::validate_rules;
