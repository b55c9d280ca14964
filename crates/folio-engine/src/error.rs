//! Engine error types.

use thiserror::Error;

use folio_core::{CoreError, PortfolioId};
use folio_risk::RiskError;
use folio_traits::TraitError;

use crate::config::ConfigError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
///
/// Only portfolio resolution, invalid requests and interrupted computations
/// surface here. Market data failures degrade the result instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The holdings store has no such portfolio.
    #[error("portfolio not found: {0}")]
    PortfolioNotFound(PortfolioId),

    /// The holdings store failed after retries.
    #[error("holdings store unavailable for {portfolio_id}: {source}")]
    HoldingsUnavailable {
        /// Requested portfolio.
        portfolio_id: PortfolioId,
        /// Last store error.
        source: TraitError,
    },

    /// The store returned holdings that do not form a valid portfolio.
    #[error("invalid portfolio {portfolio_id}: {source}")]
    InvalidPortfolio {
        /// Requested portfolio.
        portfolio_id: PortfolioId,
        /// Validation failure.
        source: CoreError,
    },

    /// Risk calculation error, including timeout and cancellation.
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True when the computation was cancelled or ran past its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Risk(e) if e.is_interrupted())
    }

    /// True when the portfolio itself could not be resolved.
    #[must_use]
    pub fn is_input_unavailable(&self) -> bool {
        matches!(
            self,
            Self::PortfolioNotFound(_) | Self::HoldingsUnavailable { .. }
        )
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::Internal(format!("computation task failed: {e}"))
    }
}
