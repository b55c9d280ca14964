//! Market data gateway trait.
//!
//! Batched methods are the primary interface; the single-symbol methods have
//! default implementations that delegate to them. Implementations backed by
//! a remote service should override the batched calls so one request covers
//! the whole symbol set.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::TraitError;
use folio_core::{PriceSeries, SecurityTags, Symbol};

/// Source of historical prices, current prices and classification tags.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Daily closes for each symbol over `[from, to]`, ordered by date.
    ///
    /// Symbols the source knows nothing about may be omitted from the map.
    async fn daily_closes(
        &self,
        symbols: &[Symbol],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<Symbol, PriceSeries>, TraitError>;

    /// Sector, asset class and issuer for each symbol.
    ///
    /// Unknown symbols may be omitted from the map.
    async fn security_tags(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, SecurityTags>, TraitError>;

    /// Latest price per symbol.
    ///
    /// The default implementation reports no prices, leaving holdings at the
    /// price they were snapshotted with.
    async fn current_prices(
        &self,
        _symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, Decimal>, TraitError> {
        Ok(HashMap::new())
    }

    /// Daily closes for a single symbol.
    async fn daily_closes_for(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, TraitError> {
        let mut map = self
            .daily_closes(std::slice::from_ref(symbol), from, to)
            .await?;
        Ok(map
            .remove(symbol)
            .unwrap_or_else(|| PriceSeries::empty(symbol.clone())))
    }

    /// Sector of a single symbol, if known.
    async fn sector(&self, symbol: &Symbol) -> Result<Option<String>, TraitError> {
        let mut map = self.security_tags(std::slice::from_ref(symbol)).await?;
        Ok(map.remove(symbol).and_then(|t| t.sector))
    }
}
