//! # CLI Errors

use thiserror::Error;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file problems
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or network I/O
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_error(message: impl Into<String>) -> Self {
        CliError::Config(message.into())
    }
}
