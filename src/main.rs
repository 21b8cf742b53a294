use audit_rating::config::Config;
use audit_rating::history::{HistoryLog, HistoryRow};
use audit_rating::rating::{InvalidInput, RuleRevision, RuleSet};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const EXIT_SUCCESS: i32 = 0;
const EXIT_INVALID_INPUT: i32 = 1;
const EXIT_IO: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score an audit file and record the result
    Score {
        /// Audit description (.yaml, .yml or .json)
        file: PathBuf,

        /// Rule revision to apply (legacy, standard, streamlined)
        #[arg(short, long)]
        revision: Option<RuleRevision>,

        /// Do not append the result to the history log
        #[arg(long)]
        no_record: bool,

        /// Print the full score report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List previously recorded audits
    History {
        /// Show only the most recent N rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Show the effective rule tables
    Rules {
        /// Rule revision to show (defaults to the configured one)
        #[arg(short, long)]
        revision: Option<RuleRevision>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "audit-rating")]
#[command(about = "Control Effectiveness and Management Control Awareness ratings for audits", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/audit-rating/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the history CSV (overrides the config file)
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    let config = match audit_rating::config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let level = audit_rating::telemetry::resolve_level(config.log_level.as_deref(), cli.verbose);
    if let Err(e) = audit_rating::telemetry::init(&level) {
        eprintln!("Config error: {}", e);
        std::process::exit(EXIT_CONFIG);
    }

    let code = match cli.command {
        Commands::Score {
            ref file,
            revision,
            no_record,
            json,
        } => run_score(&cli, &config, file, revision, no_record, json),
        Commands::History { limit, tsv } => run_history(&cli, &config, limit, tsv),
        Commands::Rules { revision } => run_rules(&config, revision),
    };
    std::process::exit(code);
}

/// Build the effective rule set and validate it at startup.
fn effective_rules(config: &Config, revision: Option<RuleRevision>) -> Result<RuleSet, i32> {
    let rules = config.rule_set(revision);
    if let Err(errors) = audit_rating::rating::validate_rules(&rules) {
        eprintln!("Rule configuration errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(EXIT_CONFIG);
    }
    debug!(revision = %rules.revision, "rule set ready");
    Ok(rules)
}

fn history_log(cli: &Cli, config: &Config) -> Result<HistoryLog, i32> {
    let path = match cli.history.clone().or_else(|| config.history_path.clone()) {
        Some(path) => path,
        None => match audit_rating::history::get_history_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("History error: {:#}", e);
                return Err(EXIT_IO);
            }
        },
    };
    Ok(HistoryLog::new(path))
}

fn run_score(
    cli: &Cli,
    config: &Config,
    file: &Path,
    revision: Option<RuleRevision>,
    no_record: bool,
    json: bool,
) -> i32 {
    let rules = match effective_rules(config, revision) {
        Ok(rules) => rules,
        Err(code) => return code,
    };

    let inputs = match audit_rating::intake::load_audit(file) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Invalid audit: {:#}", e);
            return if e.downcast_ref::<InvalidInput>().is_some() {
                EXIT_INVALID_INPUT
            } else {
                EXIT_IO
            };
        }
    };

    let report = match audit_rating::rating::evaluate(&inputs, &rules) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Invalid audit: {}", e);
            return EXIT_INVALID_INPUT;
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                return EXIT_IO;
            }
        }
    } else {
        let use_colors = audit_rating::output::should_use_colors();
        println!(
            "{}",
            audit_rating::output::format_report(&inputs, &report, use_colors)
        );
    }

    if no_record {
        return EXIT_SUCCESS;
    }

    let log = match history_log(cli, config) {
        Ok(log) => log,
        Err(code) => return code,
    };
    let row = HistoryRow::from_report(&inputs, &report, chrono::Utc::now());
    if let Err(e) = log.append(&row) {
        eprintln!("History error: {:#}", e);
        return EXIT_IO;
    }
    info!(path = %log.path().display(), audit = %inputs.audit_name, "audit recorded");

    EXIT_SUCCESS
}

fn run_history(cli: &Cli, config: &Config, limit: Option<usize>, tsv: bool) -> i32 {
    let log = match history_log(cli, config) {
        Ok(log) => log,
        Err(code) => return code,
    };

    let rows = match log.load() {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("History error: {:#}", e);
            return EXIT_IO;
        }
    };

    let start = limit.map_or(0, |n| rows.len().saturating_sub(n));
    let rows = &rows[start..];

    if tsv {
        let output = audit_rating::output::format_tsv(rows);
        if !output.is_empty() {
            println!("{}", output);
        }
    } else {
        let use_colors = audit_rating::output::should_use_colors();
        println!(
            "{}",
            audit_rating::output::format_history_table(rows, use_colors)
        );
    }

    EXIT_SUCCESS
}

fn run_rules(config: &Config, revision: Option<RuleRevision>) -> i32 {
    match effective_rules(config, revision) {
        Ok(rules) => {
            println!("{}", audit_rating::output::format_rules(&rules));
            EXIT_SUCCESS
        }
        Err(code) => code,
    }
}
