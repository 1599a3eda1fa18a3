//! CLI error types

use syndicate_types::SyndicateError;
use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The ledger refused the request; the envelope has already been printed
    #[error("{0}")]
    Ledger(#[from] SyndicateError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Process exit code: 1 for ledger rejections, 2 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Ledger(e) if e.is_rejection() => 1,
            _ => 2,
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
