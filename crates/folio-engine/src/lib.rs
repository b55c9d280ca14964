//! # Folio Engine
//!
//! Async risk engine over injected collaborators.
//!
//! This crate provides:
//! - [`RiskEngine`]: resolves portfolios and market inputs, runs the analytics
//! - [`RiskEngineBuilder`]: validated construction
//! - [`EngineConfig`]: TOML configuration, including the scenario library
//! - [`TtlCache`]: single-flight time-to-live cache for volatility and correlation
//! - [`CallPolicy`]: per-call timeout plus exponential-backoff retry
//!
//! ## Architecture
//!
//! ```text
//! HoldingsStore ──> Portfolio ──┬─> Concentration ─> Compliance
//!                               │
//! MarketDataGateway ─┬─> Tags ──┴─> Stress scenarios
//!                    │
//!                    └─> Closes ─> Volatility ─┬─> Monte Carlo VaR
//!                           (cached)           ├─> Parametric VaR
//!                                Correlation ──┴─> Performance
//! ```
//!
//! Only an unresolvable portfolio, cancellation or the computation deadline
//! fail a call. Market data problems degrade the result and are reported as
//! warnings.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = RiskEngineBuilder::new()
//!     .with_config(EngineConfig::from_file("folio.toml")?)
//!     .with_holdings_store(holdings)
//!     .with_market_data(market_data)
//!     .build()?;
//!
//! let metrics = engine
//!     .compute_risk_metrics(&PortfolioId::new("GROWTH-1"), &CancelToken::new())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod market;
pub mod runtime;
pub mod service;

pub use builder::RiskEngineBuilder;
pub use cache::{CacheStats, TtlCache};
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use market::MarketDataResolver;
pub use runtime::{CallPolicy, RetryConfig};
pub use service::{CorrelationEntry, EngineCacheStats, RiskEngine, VolatilityEntry};

// Analytics types that appear in the engine's signatures.
pub use folio_risk::{
    CancelToken, ComplianceViolation, ComputationStatus, DataWarning, RiskMetrics, SubComputation,
    VaRResult,
};
