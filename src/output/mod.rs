pub mod formatter;
pub mod writer;

pub use formatter::{
    format_explanation, format_grade_distribution, format_points, format_scored_table, format_tsv,
    should_use_colors,
};
pub use writer::{
    render_scored_accounts, write_run_summary, write_scored_accounts, OutputFormat, RunSummary,
};
