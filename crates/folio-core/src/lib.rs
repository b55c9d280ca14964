//! # Folio Core
//!
//! Core value types shared by every crate in the Folio risk engine.
//!
//! - **Identifiers**: [`Symbol`], [`PortfolioId`], [`AccountId`], [`ScenarioId`]
//! - **Positions**: [`Holding`] snapshots and the [`Portfolio`] they form
//! - **Market data**: [`PriceSeries`] of daily closes and [`SecurityTags`]
//!
//! Every type here is an immutable snapshot for the duration of one risk
//! computation. Analytics read positions; they never mutate them.
//!
//! ## Example
//!
//! ```rust
//! use folio_core::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! let holding = Holding::builder("AAPL")
//!     .account("ACC-1")
//!     .quantity(dec!(100))
//!     .current_price(dec!(190.50))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(holding.market_value(), dec!(19050.00));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod holding;
pub mod ids;
pub mod market;
pub mod portfolio;

pub use error::{CoreError, CoreResult};
pub use holding::{Holding, HoldingBuilder, DEFAULT_ACCOUNT};
pub use ids::{AccountId, PortfolioId, ScenarioId, Symbol};
pub use market::{PricePoint, PriceSeries, SecurityTags, UNKNOWN_BUCKET};
pub use portfolio::Portfolio;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::holding::{Holding, HoldingBuilder};
    pub use crate::ids::{AccountId, PortfolioId, ScenarioId, Symbol};
    pub use crate::market::{PricePoint, PriceSeries, SecurityTags, UNKNOWN_BUCKET};
    pub use crate::portfolio::Portfolio;
    pub use chrono::NaiveDate;
    pub use rust_decimal::Decimal;
}
