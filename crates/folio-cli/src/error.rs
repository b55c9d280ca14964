//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid date format.
    #[error("Invalid date format: {0}. Use YYYY-MM-DD.")]
    InvalidDate(String),

    /// Confidence level outside (0, 1).
    #[error("Invalid confidence level: {0}. Must be strictly between 0 and 1.")]
    InvalidConfidence(f64),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input files could not be loaded.
    #[error("Data error: {0}")]
    Data(String),

    /// Compliance check found breaches in strict mode.
    #[error("{0} concentration limit breach(es)")]
    NonCompliant(usize),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
