//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use syndicate_types::{ApiResponse, SyndicateResult};
use tabled::{Table, Tabled};

use crate::error::{CliError, CliResult};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON response envelope
    Json,
    /// YAML response envelope
    Yaml,
}

/// Print a ledger result in the requested format
///
/// JSON and YAML always print the `{success, data?, error?, code?}`
/// envelope, failures included. Tables go through `render` on success and
/// the error line on failure. A failure is handed back so the process can
/// exit non-zero.
pub fn emit<T: Serialize>(
    result: SyndicateResult<T>,
    format: OutputFormat,
    render: impl FnOnce(&T),
) -> CliResult<()> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let (envelope, failure) = match result {
                Ok(data) => (ApiResponse::ok(data), None),
                Err(e) => (ApiResponse::err(&e), Some(e)),
            };
            let text = match format {
                OutputFormat::Yaml => serde_yaml::to_string(&envelope)?,
                _ => serde_json::to_string_pretty(&envelope)?,
            };
            println!("{}", text);
            failure.map_or(Ok(()), |e| Err(CliError::Ledger(e)))
        }
        OutputFormat::Table => match result {
            Ok(data) => {
                render(&data);
                Ok(())
            }
            Err(e) => {
                print_error(&format!("{} [{}]", e, e.code()));
                Err(CliError::Ledger(e))
            }
        },
    }
}

/// Print rows as a table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No results".dimmed());
    } else {
        println!("{}", Table::new(rows));
    }
}

/// Print a titled list of key/value pairs
pub fn print_fields(title: &str, fields: &[(&str, String)]) {
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(50));
    for (key, value) in fields {
        println!("  {:<18} {}", format!("{}:", key).bold(), value);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}
