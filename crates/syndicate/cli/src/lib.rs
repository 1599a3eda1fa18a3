//! Syndicate CLI - Command-line interface for a pooled-fund governance ledger
//!
//! Every invocation opens the ledger file, applies one command and persists
//! the result. Operators can:
//! - Create groups, admit members and record deposits
//! - Open proposals, vote, execute and cancel them
//! - Inspect shares, proposal tracking and the audit journal

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use syndicate_runtime::{
    init_tracing, GovernanceConfig, GovernanceFacade, LedgerLock, SimulatedExecutor,
    StorageConfig, SystemClock,
};
use syndicate_types::SyndicateError;

mod commands;
mod error;
mod output;

use commands::{group, proposal};
pub use error::{CliError, CliResult};
pub use output::print_error;

/// Ledger file used when neither `--state` nor the config names one
pub const DEFAULT_STATE_FILE: &str = "syndicate-ledger.json";

/// Syndicate CLI application
#[derive(Parser)]
#[command(name = "syndicate")]
#[command(about = "Syndicate - pooled-fund membership and governance ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SYNDICATE_CONFIG")]
    config: Option<PathBuf>,

    /// Ledger state file
    #[arg(short, long, env = "SYNDICATE_STATE")]
    state: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Manage groups, members and deposits
    Group {
        #[command(subcommand)]
        command: group::GroupCommands,
    },

    /// Open, vote on and execute proposals
    Proposal {
        #[command(subcommand)]
        command: proposal::ProposalCommands,
    },

    /// Show the effective configuration
    Config,
}

/// Run using the current process arguments.
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let config = resolve_config(&cli).map_err(startup_failure)?;

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    init_tracing(&logging);

    if let Commands::Config = cli.command {
        return show_config(&config, cli.output);
    }

    // Held until the command has persisted, so concurrent invocations on
    // the same state file queue instead of overwriting each other
    let _lock = match &config.storage {
        StorageConfig::File { path } => Some(LedgerLock::acquire(path).map_err(startup_failure)?),
        StorageConfig::Memory => None,
    };

    let facade = GovernanceFacade::open(
        &config,
        Arc::new(SystemClock),
        Arc::new(SimulatedExecutor::new(true)),
    )
    .map_err(startup_failure)?;

    match cli.command {
        Commands::Group { command } => group::execute(command, &facade, cli.output),
        Commands::Proposal { command } => proposal::execute(command, &facade, cli.output),
        Commands::Config => Ok(()),
    }
}

/// Config file and environment, with the ledger always kept on disk
fn resolve_config(cli: &Cli) -> Result<GovernanceConfig, SyndicateError> {
    let config = GovernanceConfig::load(cli.config.as_deref())?;
    let path = match (&cli.state, &config.storage) {
        (Some(path), _) => path.clone(),
        (None, StorageConfig::File { path }) => path.clone(),
        (None, StorageConfig::Memory) => PathBuf::from(DEFAULT_STATE_FILE),
    };
    let config = config.with_file_storage(path);
    config.validate()?;
    Ok(config)
}

/// Errors raised before any command output exist only on stderr
fn startup_failure(e: SyndicateError) -> CliError {
    print_error(&format!("{} [{}]", e, e.code()));
    CliError::Ledger(e)
}

fn show_config(config: &GovernanceConfig, format: output::OutputFormat) -> CliResult<()> {
    match format {
        output::OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        output::OutputFormat::Yaml => println!("{}", serde_yaml::to_string(config)?),
        output::OutputFormat::Table => {
            let storage = match &config.storage {
                StorageConfig::File { path } => path.display().to_string(),
                StorageConfig::Memory => "memory".to_string(),
            };
            output::print_fields(
                "Syndicate configuration",
                &[
                    ("Max members", config.max_members.to_string()),
                    ("Voting window", format!("{}h", config.default_voting_hours)),
                    ("Quorum policy", format!("{:?}", config.quorum_policy)),
                    ("State file", storage),
                    ("Log level", config.logging.level.clone()),
                ],
            );
        }
    }
    Ok(())
}
