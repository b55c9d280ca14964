//! In-memory collaborators.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;

use folio_core::{Holding, PortfolioId, PricePoint, PriceSeries, SecurityTags, Symbol};
use folio_traits::{HoldingsStore, MarketDataGateway, TraitError};

// =============================================================================
// HOLDINGS STORE
// =============================================================================

/// Holdings keyed by portfolio.
#[derive(Debug, Default)]
pub struct InMemoryHoldingsStore {
    portfolios: DashMap<PortfolioId, Vec<Holding>>,
}

impl InMemoryHoldingsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the holdings of a portfolio.
    pub fn insert(&self, portfolio_id: impl Into<PortfolioId>, holdings: Vec<Holding>) {
        self.portfolios.insert(portfolio_id.into(), holdings);
    }

    /// Appends one holding.
    pub fn push(&self, portfolio_id: impl Into<PortfolioId>, holding: Holding) {
        self.portfolios
            .entry(portfolio_id.into())
            .or_default()
            .push(holding);
    }

    /// Removes a portfolio.
    pub fn remove(&self, portfolio_id: &PortfolioId) -> Option<Vec<Holding>> {
        self.portfolios.remove(portfolio_id).map(|(_, h)| h)
    }

    /// Known portfolio ids, sorted.
    pub fn portfolio_ids(&self) -> Vec<PortfolioId> {
        let mut ids: Vec<PortfolioId> = self.portfolios.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl HoldingsStore for InMemoryHoldingsStore {
    async fn holdings(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<Option<Vec<Holding>>, TraitError> {
        Ok(self.portfolios.get(portfolio_id).map(|h| h.clone()))
    }
}

// =============================================================================
// MARKET DATA
// =============================================================================

/// Daily closes, classification and latest prices keyed by symbol.
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    closes: DashMap<Symbol, PriceSeries>,
    tags: DashMap<Symbol, SecurityTags>,
    prices: DashMap<Symbol, Decimal>,
}

impl InMemoryMarketData {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a symbol's close history.
    pub fn insert_series(&self, series: PriceSeries) {
        self.closes.insert(series.symbol.clone(), series);
    }

    /// Adds closes to a symbol's history, replacing closes on the same dates.
    pub fn extend_closes(&self, symbol: impl Into<Symbol>, points: impl IntoIterator<Item = PricePoint>) {
        let symbol = symbol.into();
        let mut entry = self
            .closes
            .entry(symbol.clone())
            .or_insert_with(|| PriceSeries::empty(symbol.clone()));
        let mut merged = entry.points().to_vec();
        merged.extend(points);
        *entry = PriceSeries::new(symbol, merged);
    }

    /// Sets classification for a symbol.
    pub fn insert_tags(&self, symbol: impl Into<Symbol>, tags: SecurityTags) {
        self.tags.insert(symbol.into(), tags);
    }

    /// Sets the latest price for a symbol.
    pub fn insert_price(&self, symbol: impl Into<Symbol>, price: Decimal) {
        self.prices.insert(symbol.into(), price);
    }

    /// Number of symbols with close history.
    pub fn series_count(&self) -> usize {
        self.closes.len()
    }
}

#[async_trait]
impl MarketDataGateway for InMemoryMarketData {
    async fn daily_closes(
        &self,
        symbols: &[Symbol],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<Symbol, PriceSeries>, TraitError> {
        if from > to {
            return Err(TraitError::InvalidInput(format!(
                "date range {from}..{to} is reversed"
            )));
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.closes.get(s).map(|series| (s.clone(), series.window(from, to))))
            .collect())
    }

    async fn security_tags(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, SecurityTags>, TraitError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.tags.get(s).map(|t| (s.clone(), t.clone())))
            .collect())
    }

    async fn current_prices(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, Decimal>, TraitError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.prices.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }
}
