//! Error types for the Cairn CLI.

use cairn_config::ConfigError;
use cairn_discovery::DiscoveryError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Agent could not be queried
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// No matching service instance
    #[error("Not found: {0}")]
    NotFound(String),

    /// Output could not be written
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
