use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::io::IsTerminal;

use crate::records::ScoredAccount;
use crate::scoring::{CriterionPoints, Grade, ScoreResult, Weights};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format points with at most two decimals, trailing zeros trimmed
/// (2790.0 -> "2790", 162.5 -> "162.5")
pub fn format_points(points: f64) -> String {
    let formatted = format!("{:.2}", points);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

fn colorize_grade(grade: Grade) -> String {
    match grade {
        Grade::A | Grade::B => grade.as_str().green().bold().to_string(),
        Grade::C => grade.as_str().yellow().to_string(),
        Grade::D | Grade::E => grade.as_str().red().to_string(),
        Grade::F => grade.as_str().red().bold().to_string(),
    }
}

/// Format scored accounts as a table with columns:
/// Index, Member, Payment, Defaulters, Financial, Score, Grade
pub fn format_scored_table(accounts: &[&ScoredAccount], use_colors: bool) -> String {
    if accounts.is_empty() {
        return "No loan accounts scored.".to_string();
    }

    let index_width = format!("{}.", accounts.len()).len();
    let member_width = accounts
        .iter()
        .map(|a| a.member_id.chars().count())
        .max()
        .unwrap_or(0)
        .max("Member".len());
    let points_width = 10;

    let header = format!(
        "{:>iw$} {:<mw$}  {:>pw$}{:>pw$}{:>pw$}{:>pw$}  {}",
        "#",
        "Member",
        "Payment",
        "Defaulters",
        "Financial",
        "Score",
        "Grade",
        iw = index_width,
        mw = member_width,
        pw = points_width,
    );
    let header = if use_colors {
        header.dimmed().to_string()
    } else {
        header
    };

    let rows = accounts.iter().enumerate().map(|(idx, account)| {
        let index_str = format!("{:>width$}", format!("{}.", idx + 1), width = index_width);
        let score_str = format!(
            "{:>width$}",
            format_points(account.loan_score),
            width = points_width
        );
        let sub_scores = format!(
            "{:>pw$}{:>pw$}{:>pw$}",
            format_points(account.payment_history_pts),
            format_points(account.defaulters_history_pts),
            format_points(account.financial_health_pts),
            pw = points_width,
        );
        let member = format!("{:<width$}", account.member_id, width = member_width);

        if use_colors {
            format!(
                "{} {}  {}{}  {}",
                index_str.dimmed(),
                member,
                sub_scores,
                score_str.bold(),
                colorize_grade(account.loan_final_grade)
            )
        } else {
            format!(
                "{} {}  {}{}  {}",
                index_str, member, sub_scores, score_str, account.loan_final_grade
            )
        }
    });

    std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format scored accounts as tab-separated values for scripting
/// Columns: member_id, payment, defaulters, financial, score, grade (no headers, no colors)
pub fn format_tsv(accounts: &[&ScoredAccount]) -> String {
    accounts
        .iter()
        .map(|account| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                account.member_id,
                format_points(account.payment_history_pts),
                format_points(account.defaulters_history_pts),
                format_points(account.financial_health_pts),
                format_points(account.loan_score),
                account.loan_final_grade
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line: "A: 12  B: 30  C: 8  D: 2  E: 0  F: 1  (53 accounts)"
pub fn format_grade_distribution(counts: &BTreeMap<Grade, usize>, use_colors: bool) -> String {
    let total: usize = counts.values().sum();
    let parts = Grade::ALL
        .iter()
        .map(|grade| {
            let count = counts.get(grade).copied().unwrap_or(0);
            let label = if use_colors {
                colorize_grade(*grade)
            } else {
                grade.to_string()
            };
            format!("{}: {}", label, count)
        })
        .collect::<Vec<_>>()
        .join("  ");
    let noun = if total == 1 { "account" } else { "accounts" };
    format!("{}  ({} {})", parts, total, noun)
}

fn format_criterion<P: CriterionPoints>(points: &P, weight: f64, weighted: f64) -> String {
    let mut lines = vec![format!(
        "  {}: {} x {} = {}",
        P::LABEL,
        format_points(points.total()),
        weight,
        format_points(weighted)
    )];
    for (name, value) in points.entries() {
        lines.push(format!("    {:<26}{:>8}", name, format_points(value)));
    }
    lines.join("\n")
}

/// Per-criterion breakdown for every loan account of one member
pub fn format_explanation(
    member_id: &str,
    results: &[&ScoreResult],
    weights: &Weights,
    use_colors: bool,
) -> String {
    if results.is_empty() {
        return format!("No scored loan accounts for member {}.", member_id);
    }

    results
        .iter()
        .map(|result| {
            let account = &result.account;
            let breakdown = &result.breakdown;
            let title = format!("Member {} (loan {})", account.member_id, account.loan_id);
            let title = if use_colors {
                title.bold().to_string()
            } else {
                title
            };
            let grade = if use_colors {
                colorize_grade(account.loan_final_grade)
            } else {
                account.loan_final_grade.to_string()
            };

            [
                title,
                format_criterion(
                    &breakdown.payment_history,
                    weights.payment_history,
                    account.payment_history_pts,
                ),
                format_criterion(
                    &breakdown.defaulter_history,
                    weights.defaulters_history,
                    account.defaulters_history_pts,
                ),
                format_criterion(
                    &breakdown.financial_health,
                    weights.financial_health,
                    account.financial_health_pts,
                ),
                format!(
                    "  Score: {}  Grade: {}",
                    format_points(account.loan_score),
                    grade
                ),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
