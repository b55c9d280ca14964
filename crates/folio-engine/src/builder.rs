//! Builder pattern for the risk engine.

use std::sync::Arc;

use folio_traits::{HoldingsStore, MarketDataGateway};

use crate::config::{ConfigError, EngineConfig};
use crate::RiskEngine;

/// Builder for constructing a [`RiskEngine`].
pub struct RiskEngineBuilder {
    config: Option<EngineConfig>,
    holdings: Option<Arc<dyn HoldingsStore>>,
    market_data: Option<Arc<dyn MarketDataGateway>>,
}

impl RiskEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            holdings: None,
            market_data: None,
        }
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the holdings store.
    pub fn with_holdings_store(mut self, store: Arc<dyn HoldingsStore>) -> Self {
        self.holdings = Some(store);
        self
    }

    /// Set the market data gateway.
    pub fn with_market_data(mut self, gateway: Arc<dyn MarketDataGateway>) -> Self {
        self.market_data = Some(gateway);
        self
    }

    /// Build the risk engine. The configuration is validated first.
    pub fn build(self) -> Result<RiskEngine, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.check()?;

        let holdings = self.holdings.ok_or(ConfigError::Missing("holdings store"))?;
        let market_data = self
            .market_data
            .ok_or(ConfigError::Missing("market data gateway"))?;

        Ok(RiskEngine::new(config, holdings, market_data))
    }
}

impl Default for RiskEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
