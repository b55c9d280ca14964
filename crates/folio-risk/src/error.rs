//! Error types for risk calculations.

use thiserror::Error;

/// Result type for risk calculations.
pub type RiskResult<T> = Result<T, RiskError>;

/// Errors that can occur during risk calculations.
///
/// Degraded inputs (short price history, missing tags) are not errors; they
/// are recorded as [`DataWarning`](crate::DataWarning)s on the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// A required input (usually the portfolio itself) could not be resolved.
    #[error("input unavailable: {0}")]
    InputUnavailable(String),

    /// The computation exceeded its deadline.
    #[error("computation timed out after {elapsed_ms} ms")]
    ComputationTimeout {
        /// Time spent before the deadline fired.
        elapsed_ms: u64,
    },

    /// The computation was cancelled by the caller.
    #[error("computation cancelled")]
    Cancelled,

    /// Invalid input parameters
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A numeric guard tripped (zero denominator, non-finite intermediate).
    #[error("numerically degenerate: {context}")]
    NumericDegenerate {
        /// Where the degenerate value was produced.
        context: String,
    },

    /// Insufficient data for calculation
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Calculation failed
    #[error("calculation failed: {0}")]
    CalculationFailed(String),
}

impl RiskError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a numeric degenerate error.
    #[must_use]
    pub fn degenerate(context: impl Into<String>) -> Self {
        Self::NumericDegenerate {
            context: context.into(),
        }
    }

    /// Create a calculation failed error.
    #[must_use]
    pub fn calculation_failed(msg: impl Into<String>) -> Self {
        Self::CalculationFailed(msg.into())
    }

    /// True for cancellation and timeout, which carry no partial result.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::ComputationTimeout { .. })
    }
}

impl From<folio_core::CoreError> for RiskError {
    fn from(e: folio_core::CoreError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskError::ComputationTimeout { elapsed_ms: 1500 };
        assert_eq!(err.to_string(), "computation timed out after 1500 ms");

        let err = RiskError::degenerate("concentration percentages");
        assert!(err.to_string().contains("concentration percentages"));
    }

    #[test]
    fn test_interrupted() {
        assert!(RiskError::Cancelled.is_interrupted());
        assert!(RiskError::ComputationTimeout { elapsed_ms: 0 }.is_interrupted());
        assert!(!RiskError::invalid_input("x").is_interrupted());
    }
}
