//! Holdings store trait.

use async_trait::async_trait;

use crate::error::TraitError;
use folio_core::{Holding, PortfolioId};

/// Read-only source of portfolio positions.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    /// Snapshot of the holdings of a portfolio.
    ///
    /// Returns `Ok(None)` when the portfolio does not exist, and
    /// `Ok(Some(vec![]))` for a portfolio that exists but holds nothing.
    async fn holdings(&self, portfolio_id: &PortfolioId)
        -> Result<Option<Vec<Holding>>, TraitError>;
}
