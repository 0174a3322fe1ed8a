use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use loan_score::config::{self, Config, InputConfig};
use loan_score::error::{ConfigError, PipelineError};
use loan_score::output::{self, OutputFormat, RunSummary};
use loan_score::pipeline::ScoringPipeline;
use loan_score::records;

const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_OUTPUT: i32 = 5;
const EXIT_CANCELLED: i32 = 130;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score loan accounts and grade members (default if no subcommand)
    Score(ScoreArgs),
    /// Validate the scoring rules and list every problem found
    Check,
    /// Print the effective scoring rules as YAML
    Rules,
    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        /// Where to write (defaults to ~/.config/loan-score/config.yaml)
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, PartialEq)]
struct ScoreArgs {
    /// Directory holding the input files under their standard names
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    #[arg(long)]
    customers: Option<PathBuf>,
    #[arg(long)]
    loans: Option<PathBuf>,
    #[arg(long)]
    repayments: Option<PathBuf>,
    /// Defaulter delinquency file
    #[arg(long)]
    delinquencies: Option<PathBuf>,
    /// Defaulter public record / inquiry file
    #[arg(long)]
    details: Option<PathBuf>,
    /// Excluded member file (optional; missing means nobody is excluded)
    #[arg(long)]
    excluded: Option<PathBuf>,

    /// Write scored accounts to this file instead of printing a table
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Print the per-criterion breakdown for one member
    #[arg(long, value_name = "MEMBER_ID")]
    explain: Option<String>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl ScoreArgs {
    fn input_config(&self) -> InputConfig {
        InputConfig {
            dir: self.input_dir.clone(),
            customers: self.customers.clone(),
            loans: self.loans.clone(),
            repayments: self.repayments.clone(),
            delinquencies: self.delinquencies.clone(),
            details: self.details.clone(),
            excluded: self.excluded.clone(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "loan-score")]
#[command(about = "Rule-based creditworthiness scoring for loan accounts", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/loan-score/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Score options, accepted without the `score` subcommand
    #[command(flatten)]
    score: ScoreArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report_config_error(err: &ConfigError) {
    eprintln!("Config error:");
    for message in err.messages() {
        eprintln!("  - {}", message);
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = match cli.command {
        None => Commands::Score(cli.score),
        Some(command) => {
            // Global flags may precede any subcommand; score flags may not
            if cli.score != ScoreArgs::default() {
                Cli::command()
                    .error(
                        ErrorKind::ArgumentConflict,
                        "score options go after `score` or are used without a subcommand",
                    )
                    .exit();
            }
            command
        }
    };

    // init writes the config, so it must not require one to load
    if let Commands::Init { force, path } = &command {
        let path = path
            .clone()
            .or_else(|| cli.config.clone())
            .unwrap_or_else(config::get_config_path);
        let code = match config::write_default_config(&path, *force) {
            Ok(()) => {
                println!("Config written to {}", path.display());
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to write config: {:#}", e);
                EXIT_OUTPUT
            }
        };
        std::process::exit(code);
    }

    // Relative input paths in a config file are relative to that file
    let config_base = cli
        .config
        .clone()
        .unwrap_or_else(config::get_config_path)
        .parent()
        .map(Path::to_path_buf);
    let config = match config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            report_config_error(&e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let code = match command {
        Commands::Check => run_check(&config),
        Commands::Rules => run_rules(&config),
        Commands::Score(args) => run_score(&config, config_base.as_deref(), &args),
        Commands::Init { .. } => EXIT_SUCCESS,
    };
    std::process::exit(code);
}

fn run_check(config: &Config) -> i32 {
    match config.rule_table() {
        Ok(_) => {
            println!("Scoring rules OK");
            EXIT_SUCCESS
        }
        Err(e) => {
            report_config_error(&e);
            EXIT_CONFIG
        }
    }
}

fn run_rules(config: &Config) -> i32 {
    if let Err(e) = config.rule_table() {
        report_config_error(&e);
        return EXIT_CONFIG;
    }
    match serde_saphyr::to_string(&config.effective_rules()) {
        Ok(yaml) => {
            print!("{}", yaml);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize rules: {}", e);
            EXIT_OUTPUT
        }
    }
}

fn run_score(config: &Config, config_base: Option<&Path>, args: &ScoreArgs) -> i32 {
    let start_time = Instant::now();

    // Rules are validated before any input is read
    let rules = match config.rule_table() {
        Ok(r) => r,
        Err(e) => {
            report_config_error(&e);
            return EXIT_CONFIG;
        }
    };

    // CLI flags override config file settings
    let file_inputs = config.inputs.clone().unwrap_or_default();
    let file_inputs = match config_base {
        Some(base) => file_inputs.rebased(base),
        None => file_inputs,
    };
    let paths = match file_inputs.merged_with(&args.input_config()).resolve() {
        Ok(p) => p,
        Err(missing) => {
            eprintln!(
                "No input location for: {}. Pass --input-dir or set inputs.dir in the config.",
                missing.join(", ")
            );
            return EXIT_INPUT;
        }
    };
    let file_output = config.output.clone().unwrap_or_default();
    let output_path = args.output.clone().or(file_output.path);
    let summary_path = args.summary.clone().or(file_output.summary);
    let format = args.format.or(file_output.format);

    let inputs = match records::load_inputs(&paths) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Input error: {:#}", e);
            return EXIT_INPUT;
        }
    };

    let pipeline = ScoringPipeline::new(&rules);
    let cancel = pipeline.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed)) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let result = match args.threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| pipeline.run(&inputs)),
            Err(e) => {
                eprintln!("Failed to start {} worker threads: {}", threads, e);
                return EXIT_CONFIG;
            }
        },
        None => pipeline.run(&inputs),
    };
    let scored = match result {
        Ok(s) => s,
        Err(PipelineError::Cancelled) => {
            eprintln!("Cancelled; no output written.");
            return EXIT_CANCELLED;
        }
    };

    let use_colors = output::should_use_colors();
    let accounts = scored.accounts();

    match &output_path {
        Some(path) => {
            let format = format.unwrap_or_default();
            if let Err(e) = output::write_scored_accounts(path, &accounts, format) {
                eprintln!("Output error: {:#}", e);
                return EXIT_OUTPUT;
            }
            info!(path = %path.display(), rows = accounts.len(), "Wrote scored accounts");
        }
        None => match format {
            // TSV without headers for scripting
            Some(OutputFormat::Tsv) => {
                let tsv = output::format_tsv(&accounts);
                if !tsv.is_empty() {
                    println!("{}", tsv);
                }
            }
            Some(OutputFormat::Csv) => {
                let stdout = std::io::stdout();
                let rendered =
                    output::render_scored_accounts(stdout.lock(), &accounts, OutputFormat::Csv);
                if let Err(e) = rendered {
                    eprintln!("Output error: {:#}", e);
                    return EXIT_OUTPUT;
                }
            }
            None => {
                println!("{}", output::format_scored_table(&accounts, use_colors));
                println!();
                println!(
                    "{}",
                    output::format_grade_distribution(&scored.grade_counts(), use_colors)
                );
            }
        },
    }

    if let Some(member_id) = &args.explain {
        let results = scored.results_for_member(member_id);
        println!();
        println!(
            "{}",
            output::format_explanation(member_id, &results, &rules.weights, use_colors)
        );
    }

    if let Some(path) = &summary_path {
        let summary = RunSummary::from_output(&scored, start_time.elapsed());
        if let Err(e) = output::write_run_summary(path, &summary) {
            eprintln!("Output error: {:#}", e);
            return EXIT_OUTPUT;
        }
    }

    info!(
        scored = scored.stats.scored,
        dropped = scored.stats.join_drops(),
        elapsed = %humantime::format_duration(start_time.elapsed()),
        "Done"
    );
    EXIT_SUCCESS
}
