//! Market data resolution with timeouts, retries and graceful fallback.
//!
//! Gateway failures never escape this module as errors. A failed call comes
//! back as a [`DataWarning::GatewayUnavailable`] and the caller continues on
//! fallback defaults.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use folio_core::{Portfolio, PriceSeries, Symbol};
use folio_risk::concentration::unresolved_symbols;
use folio_risk::{DataWarning, TagMap};
use folio_traits::{MarketDataGateway, TraitError};

use crate::runtime::CallPolicy;

/// Batched, policy-guarded access to a [`MarketDataGateway`].
#[derive(Clone)]
pub struct MarketDataResolver {
    gateway: Arc<dyn MarketDataGateway>,
    policy: CallPolicy,
}

fn unavailable(operation: &str, error: &TraitError) -> DataWarning {
    DataWarning::GatewayUnavailable {
        operation: operation.to_string(),
        reason: error.to_string(),
    }
}

impl MarketDataResolver {
    /// Wraps a gateway.
    pub fn new(gateway: Arc<dyn MarketDataGateway>, policy: CallPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Daily closes for all `symbols` in one batched call.
    ///
    /// Symbols the gateway does not know are simply absent from the map.
    /// `Err` carries the warning describing a call that failed after retries.
    pub async fn daily_closes(
        &self,
        symbols: &[Symbol],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<Symbol, PriceSeries>, DataWarning> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let result = self
            .policy
            .call("daily_closes", || self.gateway.daily_closes(symbols, from, to))
            .await;
        match result {
            Ok(series) => {
                debug!(
                    requested = symbols.len(),
                    returned = series.len(),
                    %from,
                    %to,
                    "Fetched daily closes"
                );
                Ok(series)
            }
            Err(e) => Err(unavailable("daily_closes", &e)),
        }
    }

    /// Classification for every holding whose preset tags are incomplete.
    ///
    /// Symbols still unresolved afterwards are reported as warnings and land
    /// in the Unknown bucket.
    pub async fn security_tags(&self, portfolio: &Portfolio) -> (TagMap, Vec<DataWarning>) {
        let needed: Vec<Symbol> = portfolio
            .holdings()
            .iter()
            .filter(|h| !h.tags.is_complete())
            .map(|h| h.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut warnings = Vec::new();
        let tags = if needed.is_empty() {
            TagMap::new()
        } else {
            match self
                .policy
                .call("security_tags", || self.gateway.security_tags(&needed))
                .await
            {
                Ok(tags) => tags,
                Err(e) => {
                    warnings.push(unavailable("security_tags", &e));
                    TagMap::new()
                }
            }
        };

        let unresolved = unresolved_symbols(portfolio, &tags);
        if !unresolved.is_empty() {
            warn!(count = unresolved.len(), "Unresolved security classification");
        }
        warnings.extend(
            unresolved
                .into_iter()
                .map(|symbol| DataWarning::UnresolvedTags { symbol }),
        );
        (tags, warnings)
    }

    /// Latest prices, where the gateway supplies them.
    pub async fn current_prices(
        &self,
        symbols: &[Symbol],
    ) -> (HashMap<Symbol, Decimal>, Vec<DataWarning>) {
        if symbols.is_empty() {
            return (HashMap::new(), Vec::new());
        }
        match self
            .policy
            .call("current_prices", || self.gateway.current_prices(symbols))
            .await
        {
            Ok(prices) => (prices, Vec::new()),
            Err(e) => (HashMap::new(), vec![unavailable("current_prices", &e)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use folio_core::{Holding, PortfolioId, SecurityTags};
    use rust_decimal_macros::dec;

    use crate::runtime::RetryConfig;

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MarketDataGateway for Flaky {
        async fn daily_closes(
            &self,
            symbols: &[Symbol],
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<HashMap<Symbol, PriceSeries>, TraitError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(TraitError::ConnectionFailed("reset".into()));
            }
            Ok(symbols
                .iter()
                .map(|s| (s.clone(), PriceSeries::empty(s.clone())))
                .collect())
        }

        async fn security_tags(
            &self,
            symbols: &[Symbol],
        ) -> Result<HashMap<Symbol, SecurityTags>, TraitError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(TraitError::Timeout);
            }
            Ok(symbols
                .iter()
                .filter(|s| s.as_str() != "MYSTERY")
                .map(|s| {
                    let tags = SecurityTags::new()
                        .with_sector("Technology")
                        .with_asset_class("Equity")
                        .with_issuer(s.as_str());
                    (s.clone(), tags)
                })
                .collect())
        }
    }

    fn resolver(failures: u32) -> MarketDataResolver {
        let policy = CallPolicy::new(
            Duration::from_secs(1),
            RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                backoff_multiplier: 2.0,
                jitter: false,
            },
        );
        MarketDataResolver::new(
            Arc::new(Flaky {
                failures,
                calls: AtomicU32::new(0),
            }),
            policy,
        )
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn portfolio() -> Portfolio {
        let h = |s: &str| {
            Holding::builder(s)
                .quantity(dec!(1))
                .current_price(dec!(10))
                .build()
                .unwrap()
        };
        Portfolio::new(PortfolioId::new("P"), d(28), vec![h("AAPL"), h("MYSTERY")]).unwrap()
    }

    #[tokio::test]
    async fn test_closes_recover_after_retries() {
        let symbols = [Symbol::new("AAPL")];
        let closes = resolver(2).daily_closes(&symbols, d(1), d(28)).await.unwrap();
        assert!(closes.contains_key(&symbols[0]));
    }

    #[tokio::test]
    async fn test_closes_failure_becomes_warning() {
        let symbols = [Symbol::new("AAPL")];
        let warning = resolver(10)
            .daily_closes(&symbols, d(1), d(28))
            .await
            .unwrap_err();
        assert!(matches!(warning, DataWarning::GatewayUnavailable { ref operation, .. } if operation == "daily_closes"));
    }

    #[tokio::test]
    async fn test_tags_report_unresolved() {
        let (tags, warnings) = resolver(0).security_tags(&portfolio()).await;
        assert_eq!(tags.len(), 1);
        assert_eq!(
            warnings,
            vec![DataWarning::UnresolvedTags {
                symbol: Symbol::new("MYSTERY")
            }]
        );

        let (tags, warnings) = resolver(10).security_tags(&portfolio()).await;
        assert!(tags.is_empty());
        assert!(matches!(warnings[0], DataWarning::GatewayUnavailable { .. }));
        assert_eq!(warnings.len(), 3);
    }

    #[tokio::test]
    async fn test_default_prices_are_empty() {
        let (prices, warnings) = resolver(0).current_prices(&[Symbol::new("AAPL")]).await;
        assert!(prices.is_empty());
        assert!(warnings.is_empty());
    }
}
