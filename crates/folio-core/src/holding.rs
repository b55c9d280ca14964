//! Holding snapshots.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{AccountId, Symbol};
use crate::market::SecurityTags;

/// Account used when a holding is not attributed to a specific account.
pub const DEFAULT_ACCOUNT: &str = "DEFAULT";

/// A single position in a portfolio.
///
/// A holding is an immutable snapshot taken at computation time. Classification
/// tags may be preset by the holdings store; anything left unresolved is
/// looked up from the market data gateway when concentration is analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Security symbol.
    pub symbol: Symbol,

    /// Account the position is held in.
    pub account: AccountId,

    /// Number of units held. Negative for short positions.
    pub quantity: Decimal,

    /// Average purchase price per unit.
    pub purchase_price: Decimal,

    /// Latest price per unit.
    pub current_price: Decimal,

    /// Classification tags known at snapshot time.
    #[serde(default)]
    pub tags: SecurityTags,
}

impl Holding {
    /// Creates a new holding builder for `symbol`.
    #[must_use]
    pub fn builder(symbol: impl Into<Symbol>) -> HoldingBuilder {
        HoldingBuilder::new().symbol(symbol)
    }

    /// Market value: quantity × current price.
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    /// Market value as `f64`, for statistical work.
    #[must_use]
    pub fn market_value_f64(&self) -> f64 {
        self.market_value().to_f64().unwrap_or(0.0)
    }

    /// Cost basis: quantity × purchase price.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.purchase_price
    }

    /// Unrealized gain or loss in currency.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        self.market_value() - self.cost_basis()
    }

    /// Unrealized gain or loss as a percentage of cost basis.
    ///
    /// Returns `None` when the cost basis is zero.
    #[must_use]
    pub fn gain_loss_pct(&self) -> Option<Decimal> {
        let basis = self.cost_basis();
        if basis.is_zero() {
            None
        } else {
            Some(self.unrealized_pnl() / basis.abs() * Decimal::ONE_HUNDRED)
        }
    }
}

/// Builder for [`Holding`].
#[derive(Debug, Clone, Default)]
pub struct HoldingBuilder {
    symbol: Option<Symbol>,
    account: Option<AccountId>,
    quantity: Option<Decimal>,
    purchase_price: Option<Decimal>,
    current_price: Option<Decimal>,
    tags: SecurityTags,
}

impl HoldingBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the symbol.
    #[must_use]
    pub fn symbol(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Sets the account.
    #[must_use]
    pub fn account(mut self, account: impl Into<AccountId>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the quantity.
    #[must_use]
    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the purchase price.
    #[must_use]
    pub fn purchase_price(mut self, price: Decimal) -> Self {
        self.purchase_price = Some(price);
        self
    }

    /// Sets the current price.
    #[must_use]
    pub fn current_price(mut self, price: Decimal) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Sets the sector tag.
    #[must_use]
    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.tags.sector = Some(sector.into());
        self
    }

    /// Sets the asset class tag.
    #[must_use]
    pub fn asset_class(mut self, asset_class: impl Into<String>) -> Self {
        self.tags.asset_class = Some(asset_class.into());
        self
    }

    /// Sets the issuer tag.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.tags.issuer = Some(issuer.into());
        self
    }

    /// Sets all classification tags.
    #[must_use]
    pub fn tags(mut self, tags: SecurityTags) -> Self {
        self.tags = tags;
        self
    }

    /// Builds the holding.
    ///
    /// The purchase price defaults to the current price when not given.
    pub fn build(self) -> CoreResult<Holding> {
        let symbol = self.symbol.ok_or_else(|| CoreError::missing_field("symbol"))?;
        if symbol.is_empty() {
            return Err(CoreError::InvalidIdentifier("empty symbol".into()));
        }

        let quantity = self
            .quantity
            .ok_or_else(|| CoreError::missing_field("quantity"))?;
        let current_price = self
            .current_price
            .ok_or_else(|| CoreError::missing_field("current_price"))?;

        if current_price.is_sign_negative() && !current_price.is_zero() {
            return Err(CoreError::invalid_holding(
                symbol.as_str(),
                "current price cannot be negative",
            ));
        }

        let purchase_price = self.purchase_price.unwrap_or(current_price);
        if purchase_price.is_sign_negative() && !purchase_price.is_zero() {
            return Err(CoreError::invalid_holding(
                symbol.as_str(),
                "purchase price cannot be negative",
            ));
        }

        Ok(Holding {
            symbol,
            account: self
                .account
                .unwrap_or_else(|| AccountId::new(DEFAULT_ACCOUNT)),
            quantity,
            purchase_price,
            current_price,
            tags: self.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_value() {
        let h = Holding::builder("AAPL")
            .quantity(dec!(100))
            .purchase_price(dec!(150))
            .current_price(dec!(180))
            .build()
            .unwrap();

        assert_eq!(h.market_value(), dec!(18000));
        assert_eq!(h.cost_basis(), dec!(15000));
        assert_eq!(h.unrealized_pnl(), dec!(3000));
        assert_eq!(h.gain_loss_pct(), Some(dec!(20)));
        assert_eq!(h.account.as_str(), DEFAULT_ACCOUNT);
    }

    #[test]
    fn test_purchase_price_defaults_to_current() {
        let h = Holding::builder("MSFT")
            .quantity(dec!(10))
            .current_price(dec!(400))
            .build()
            .unwrap();
        assert_eq!(h.purchase_price, dec!(400));
        assert_eq!(h.unrealized_pnl(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_cost_basis_has_no_pct() {
        let h = Holding::builder("GIFT")
            .quantity(dec!(10))
            .purchase_price(Decimal::ZERO)
            .current_price(dec!(5))
            .build()
            .unwrap();
        assert!(h.gain_loss_pct().is_none());
    }

    #[test]
    fn test_missing_fields() {
        let err = HoldingBuilder::new().quantity(dec!(1)).build().unwrap_err();
        assert_eq!(err, CoreError::missing_field("symbol"));

        let err = Holding::builder("AAPL").current_price(dec!(1)).build().unwrap_err();
        assert_eq!(err, CoreError::missing_field("quantity"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = Holding::builder("AAPL")
            .quantity(dec!(1))
            .current_price(dec!(-1))
            .build();
        assert!(matches!(result, Err(CoreError::InvalidHolding { .. })));
    }

    #[test]
    fn test_tags_from_builder() {
        let h = Holding::builder("XOM")
            .quantity(dec!(1))
            .current_price(dec!(100))
            .sector("Energy")
            .issuer("Exxon Mobil")
            .build()
            .unwrap();
        assert_eq!(h.tags.sector_bucket(), "Energy");
        assert_eq!(h.tags.asset_class_bucket(), crate::UNKNOWN_BUCKET);
    }
}
