// rentradar CLI - run listing dedupe cycles from collector output files

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use rentradar_dedupe::{canonical_key, DedupeConfig, DedupeError};
use tracing_subscriber::EnvFilter;

use exit_codes::{dedupe_exit_code, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "rentradar")]
#[command(about = "Cross-source rental listing deduplication")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one polling cycle per input file against a shared registry
    #[command(after_help = "\
Examples:
  rentradar run cycle1.jsonl cycle2.jsonl
  rentradar run --config rentradar.toml collected/*.jsonl --output forwarded.jsonl
  rentradar run cycle.csv --report reports.json")]
    Run {
        /// Candidate files (JSON Lines, or CSV by .csv extension), one per cycle
        #[arg(required = true)]
        cycles: Vec<PathBuf>,

        /// Engine config (TOML). Defaults apply when omitted.
        #[arg(long, short = 'c', env = "RENTRADAR_CONFIG")]
        config: Option<PathBuf>,

        /// Write forwarded records here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the cycle reports as a JSON array to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Parse and validate an engine config without running
    #[command(after_help = "\
Examples:
  rentradar validate rentradar.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Print the canonical key of an address as JSON
    #[command(after_help = "\
Examples:
  rentradar key '12 Oak Road, Lincoln, LN1 2AB'")]
    Key {
        /// Free-text address
        address: String,
    },

    /// Drop repeats within a single file, without a registry
    #[command(after_help = "\
Examples:
  rentradar batch collected.jsonl > unique.jsonl")]
    Batch {
        /// Candidate file (JSON Lines, or CSV by .csv extension)
        file: PathBuf,

        /// Write kept records here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Engine error, prefixed with the file it came from.
    pub fn dedupe(path: &std::path::Path, err: DedupeError) -> Self {
        Self::new(dedupe_exit_code(&err), format!("{}: {err}", path.display()))
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also land here
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { cycles, config, output, report } => run::cmd_run(cycles, config, output, report),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Key { address } => cmd_key(&address),
        Commands::Batch { file, output } => run::cmd_batch(file, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Read, parse and validate a config file.
pub fn load_config(path: &std::path::Path) -> Result<DedupeConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    DedupeConfig::from_toml(&text).map_err(|e| {
        CliError::dedupe(path, e).with_hint("run `rentradar validate <config>` for details")
    })
}

fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&path).map_err(|mut e| {
        e.hint = None;
        e
    })?;
    let order: Vec<&str> = config.source_order.iter().map(|s| s.as_str()).collect();
    let trust: Vec<&str> = config.trust.iter().map(|s| s.as_str()).collect();
    println!("ok: {}", config.name);
    println!("  source order: {}", order.join(", "));
    println!("  trust:        {}", trust.join(" > "));
    println!(
        "  matching:     rent ±{:.0}%, street ≥ {:.2} ({:?}, {:?})",
        config.matching.rent_tolerance * 100.0,
        config.matching.street_similarity,
        config.matching.metric,
        config.matching.strategy,
    );
    match config.retention.ttl_hours {
        Some(hours) => println!("  retention:    {hours}h"),
        None => println!("  retention:    forever"),
    }
    Ok(())
}

fn cmd_key(address: &str) -> Result<(), CliError> {
    let key = canonical_key(address);
    let out = serde_json::json!({
        "postcode": key.postcode,
        "houseNumber": key.house_number,
        "street": key.street,
        "key": key.to_string(),
        "resolvable": !key.is_unresolvable(),
    });
    let text = serde_json::to_string_pretty(&out)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}
