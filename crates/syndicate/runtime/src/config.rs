//! Configuration for the governance ledger

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use syndicate_types::{
    SyndicateError, SyndicateResult, DEFAULT_VOTING_HOURS, MAX_MEMBERS, MAX_VOTING_HOURS,
};

/// Main ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Group capacity
    #[serde(default = "default_max_members")]
    pub max_members: u32,

    /// Voting window used when a proposal does not pick one
    #[serde(default = "default_voting_hours")]
    pub default_voting_hours: u32,

    /// Member count quorum is measured against
    #[serde(default)]
    pub quorum_policy: QuorumPolicy,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            max_members: MAX_MEMBERS,
            default_voting_hours: DEFAULT_VOTING_HOURS,
            quorum_policy: QuorumPolicy::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Which member count the quorum of a proposal is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuorumPolicy {
    /// The group's member count at execution time; a member who joins
    /// mid-vote raises the bar
    #[default]
    Live,
    /// The member count captured when the proposal was created
    Snapshot,
}

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Nothing survives the process (for development/testing)
    #[default]
    Memory,
    /// JSON snapshot file, rewritten after every mutation
    File {
        path: PathBuf,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON format
    #[serde(default)]
    pub json: bool,
    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            timestamps: true,
        }
    }
}

// Default value helpers

fn default_max_members() -> u32 {
    MAX_MEMBERS
}

fn default_voting_hours() -> u32 {
    DEFAULT_VOTING_HOURS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl GovernanceConfig {
    /// Load configuration: defaults, then the file (if given), then
    /// `SYNDICATE_*` environment variables (`__` separates nested keys,
    /// e.g. `SYNDICATE_LOGGING__LEVEL=debug`)
    pub fn load(path: Option<&Path>) -> SyndicateResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&GovernanceConfig::default()).map_err(config_error)?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SYNDICATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: GovernanceConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot honor
    pub fn validate(&self) -> SyndicateResult<()> {
        if self.max_members == 0 || self.max_members > u8::MAX as u32 {
            return Err(SyndicateError::Config(format!(
                "max_members must be between 1 and 255, got {}",
                self.max_members
            )));
        }
        if self.default_voting_hours == 0 || self.default_voting_hours > MAX_VOTING_HOURS {
            return Err(SyndicateError::Config(format!(
                "default_voting_hours must be between 1 and {}, got {}",
                MAX_VOTING_HOURS, self.default_voting_hours
            )));
        }
        if let StorageConfig::File { path } = &self.storage {
            if path.as_os_str().is_empty() {
                return Err(SyndicateError::Config("storage path must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Configuration for a file-backed ledger at `path`
    pub fn with_file_storage(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageConfig::File { path: path.into() };
        self
    }

    pub fn with_quorum_policy(mut self, policy: QuorumPolicy) -> Self {
        self.quorum_policy = policy;
        self
    }
}

fn config_error(e: config::ConfigError) -> SyndicateError {
    SyndicateError::Config(e.to_string())
}
