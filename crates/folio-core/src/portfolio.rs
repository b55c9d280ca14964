//! Portfolio snapshots.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::holding::Holding;
use crate::ids::{PortfolioId, Symbol};

/// A set of holdings valued as of a single date.
///
/// A symbol may appear in several accounts; the pair (symbol, account) is
/// unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    id: PortfolioId,
    as_of: NaiveDate,
    holdings: Vec<Holding>,
}

impl Portfolio {
    /// Creates a portfolio, rejecting duplicate (symbol, account) pairs.
    pub fn new(id: PortfolioId, as_of: NaiveDate, holdings: Vec<Holding>) -> CoreResult<Self> {
        let mut seen = HashSet::with_capacity(holdings.len());
        for h in &holdings {
            if !seen.insert((&h.symbol, &h.account)) {
                return Err(CoreError::DuplicateHolding {
                    symbol: h.symbol.to_string(),
                    account: h.account.to_string(),
                });
            }
        }

        Ok(Self {
            id,
            as_of,
            holdings,
        })
    }

    /// Portfolio identifier.
    #[must_use]
    pub fn id(&self) -> &PortfolioId {
        &self.id
    }

    /// Valuation date.
    #[must_use]
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// All holdings in insertion order.
    #[must_use]
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Returns true if the portfolio has no holdings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Number of holdings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// Sum of holding market values.
    #[must_use]
    pub fn total_value(&self) -> Decimal {
        self.holdings.iter().map(Holding::market_value).sum()
    }

    /// Distinct symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.exposures().into_keys().collect()
    }

    /// Market value per symbol, summed across accounts.
    #[must_use]
    pub fn exposures(&self) -> BTreeMap<Symbol, Decimal> {
        let mut out = BTreeMap::new();
        for h in &self.holdings {
            *out.entry(h.symbol.clone()).or_insert(Decimal::ZERO) += h.market_value();
        }
        out
    }

    /// Holdings for one symbol across all accounts.
    pub fn holdings_for<'a>(&'a self, symbol: &'a Symbol) -> impl Iterator<Item = &'a Holding> + 'a {
        self.holdings.iter().filter(move |h| &h.symbol == symbol)
    }
}
