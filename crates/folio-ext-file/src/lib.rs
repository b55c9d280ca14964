//! # Folio Ext File
//!
//! Collaborator implementations for the Folio risk engine.
//!
//! - [`InMemoryHoldingsStore`] and [`InMemoryMarketData`]: hash-map backed
//!   collaborators for tests and embedding
//! - CSV loaders for holdings, daily closes and a security master that
//!   populate the in-memory collaborators
//!
//! For production market data, implement
//! [`MarketDataGateway`](folio_traits::MarketDataGateway) over a real feed.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod files;
mod memory;

pub use files::*;
pub use memory::*;

use std::path::Path;
use std::sync::Arc;

use folio_traits::TraitError;

/// Loads file-backed collaborators.
///
/// `securities_csv` is optional; without it, classification comes only from
/// the holdings file.
pub fn create_file_collaborators(
    holdings_csv: impl AsRef<Path>,
    closes_csv: impl AsRef<Path>,
    securities_csv: Option<&Path>,
) -> Result<(Arc<InMemoryHoldingsStore>, Arc<InMemoryMarketData>), TraitError> {
    let store = InMemoryHoldingsStore::from_csv(holdings_csv)?;
    let market = InMemoryMarketData::new();
    market.load_closes_csv(closes_csv)?;
    if let Some(path) = securities_csv {
        market.load_securities_csv(path)?;
    }
    Ok((Arc::new(store), Arc::new(market)))
}
