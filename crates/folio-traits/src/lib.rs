//! # Folio Traits
//!
//! Interfaces to the collaborators the risk engine depends on.
//!
//! This crate contains ONLY trait definitions. Implementations live in
//! extension crates (`folio-ext-file`) or in the embedding application.
//!
//! - [`holdings`]: read-only access to portfolio positions
//! - [`market_data`]: daily closes, current prices and classification tags
//!
//! ## Dependency Injection
//!
//! The engine receives its collaborators through a builder, and the
//! composition root owns their connection lifecycle:
//!
//! ```ignore
//! RiskEngineBuilder::new()
//!     .with_holdings(impl HoldingsStore)
//!     .with_market_data(impl MarketDataGateway)
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod holdings;
pub mod market_data;

pub use error::TraitError;
pub use holdings::HoldingsStore;
pub use market_data::MarketDataGateway;
