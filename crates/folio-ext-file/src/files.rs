//! CSV loaders.
//!
//! Three files feed the in-memory collaborators:
//!
//! ```text
//! holdings.csv    portfolio_id,account,symbol,quantity,purchase_price,current_price,sector,asset_class,issuer
//! closes.csv      symbol,date,close
//! securities.csv  symbol,sector,asset_class,issuer,price
//! ```
//!
//! Empty cells are treated as missing. Dates are ISO 8601 (`2024-06-28`).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use folio_core::{Holding, PortfolioId, PricePoint, SecurityTags, Symbol};
use folio_traits::TraitError;

use crate::memory::{InMemoryHoldingsStore, InMemoryMarketData};

// =============================================================================
// RECORDS
// =============================================================================

/// One row of a holdings file.
#[derive(Debug, Deserialize)]
struct HoldingRecord {
    portfolio_id: String,
    account: Option<String>,
    symbol: String,
    quantity: f64,
    purchase_price: Option<f64>,
    current_price: f64,
    sector: Option<String>,
    asset_class: Option<String>,
    issuer: Option<String>,
}

/// One row of a closes file.
#[derive(Debug, Deserialize)]
struct CloseRecord {
    symbol: String,
    date: NaiveDate,
    close: f64,
}

/// One row of a security master file.
#[derive(Debug, Deserialize)]
struct SecurityRecord {
    symbol: String,
    sector: Option<String>,
    asset_class: Option<String>,
    issuer: Option<String>,
    price: Option<f64>,
}

fn read_records<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>, TraitError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader
        .deserialize()
        .map(|row| row.map_err(|e| TraitError::ParseError(e.to_string())))
        .collect()
}

fn open(path: &Path) -> Result<std::fs::File, TraitError> {
    if !path.exists() {
        return Err(TraitError::NotFound(path.display().to_string()));
    }
    debug!(path = %path.display(), "Loading CSV");
    Ok(std::fs::File::open(path)?)
}

fn decimal(value: f64, field: &str, symbol: &str) -> Result<Decimal, TraitError> {
    Decimal::try_from(value)
        .map_err(|e| TraitError::ParseError(format!("{symbol}: invalid {field} {value}: {e}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// HOLDINGS
// =============================================================================

/// Parses holdings CSV into holdings grouped by portfolio, in file order.
pub fn parse_holdings<R: Read>(reader: R) -> Result<BTreeMap<PortfolioId, Vec<Holding>>, TraitError> {
    let mut portfolios: BTreeMap<PortfolioId, Vec<Holding>> = BTreeMap::new();

    for record in read_records::<HoldingRecord, _>(reader)? {
        let mut builder = Holding::builder(record.symbol.as_str())
            .quantity(decimal(record.quantity, "quantity", &record.symbol)?)
            .current_price(decimal(record.current_price, "current_price", &record.symbol)?);
        if let Some(account) = non_empty(record.account) {
            builder = builder.account(account);
        }
        if let Some(price) = record.purchase_price {
            builder = builder.purchase_price(decimal(price, "purchase_price", &record.symbol)?);
        }
        if let Some(sector) = non_empty(record.sector) {
            builder = builder.sector(sector);
        }
        if let Some(asset_class) = non_empty(record.asset_class) {
            builder = builder.asset_class(asset_class);
        }
        if let Some(issuer) = non_empty(record.issuer) {
            builder = builder.issuer(issuer);
        }

        portfolios
            .entry(PortfolioId::new(record.portfolio_id))
            .or_default()
            .push(builder.build()?);
    }

    Ok(portfolios)
}

impl InMemoryHoldingsStore {
    /// Loads a holdings CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let store = Self::new();
        for (id, holdings) in parse_holdings(open(path.as_ref())?)? {
            store.insert(id, holdings);
        }
        Ok(store)
    }
}

// =============================================================================
// MARKET DATA
// =============================================================================

/// Parses closes CSV into points grouped by symbol.
pub fn parse_closes<R: Read>(reader: R) -> Result<BTreeMap<Symbol, Vec<PricePoint>>, TraitError> {
    let mut closes: BTreeMap<Symbol, Vec<PricePoint>> = BTreeMap::new();
    for record in read_records::<CloseRecord, _>(reader)? {
        closes
            .entry(Symbol::new(&record.symbol))
            .or_default()
            .push(PricePoint::new(record.date, record.close));
    }
    Ok(closes)
}

/// Parses a security master CSV into classification tags and optional latest
/// prices.
pub fn parse_securities<R: Read>(
    reader: R,
) -> Result<Vec<(Symbol, SecurityTags, Option<Decimal>)>, TraitError> {
    read_records::<SecurityRecord, _>(reader)?
        .into_iter()
        .map(|r| {
            let price = r
                .price
                .map(|p| decimal(p, "price", &r.symbol))
                .transpose()?;
            let tags = SecurityTags {
                sector: non_empty(r.sector),
                asset_class: non_empty(r.asset_class),
                issuer: non_empty(r.issuer),
            };
            Ok((Symbol::new(&r.symbol), tags, price))
        })
        .collect()
}

impl InMemoryMarketData {
    /// Adds closes from a CSV file. Returns the number of symbols loaded.
    pub fn load_closes_csv(&self, path: impl AsRef<Path>) -> Result<usize, TraitError> {
        let closes = parse_closes(open(path.as_ref())?)?;
        let count = closes.len();
        for (symbol, points) in closes {
            self.extend_closes(symbol, points);
        }
        Ok(count)
    }

    /// Adds classification and prices from a security master CSV file.
    pub fn load_securities_csv(&self, path: impl AsRef<Path>) -> Result<usize, TraitError> {
        let rows = parse_securities(open(path.as_ref())?)?;
        let count = rows.len();
        for (symbol, tags, price) in rows {
            if let Some(price) = price {
                self.insert_price(symbol.clone(), price);
            }
            self.insert_tags(symbol, tags);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HOLDINGS: &str = "\
portfolio_id,account,symbol,quantity,purchase_price,current_price,sector,asset_class,issuer
P1,ACC-1,aapl,100,150.25,190.50,Technology,Equity,Apple Inc
P1,,XOM,50,,110.00,,Equity,
P2,ACC-9,AGG,200,98,97.5,,Fixed Income,iShares
";

    #[test]
    fn test_parse_holdings_groups_by_portfolio() {
        let portfolios = parse_holdings(HOLDINGS.as_bytes()).unwrap();
        assert_eq!(portfolios.len(), 2);

        let p1 = &portfolios[&PortfolioId::new("P1")];
        assert_eq!(p1.len(), 2);
        assert_eq!(p1[0].symbol, Symbol::new("AAPL"));
        assert_eq!(p1[0].market_value(), dec!(19050));
        assert_eq!(p1[0].tags.issuer.as_deref(), Some("Apple Inc"));

        // Blank cells fall back to builder defaults.
        assert_eq!(p1[1].account.as_str(), folio_core::DEFAULT_ACCOUNT);
        assert_eq!(p1[1].purchase_price, dec!(110));
        assert!(p1[1].tags.sector.is_none());
    }

    #[test]
    fn test_parse_holdings_rejects_bad_rows() {
        let bad = "portfolio_id,account,symbol,quantity,purchase_price,current_price,sector,asset_class,issuer\nP1,A,MSFT,abc,,1,,,\n";
        assert!(matches!(parse_holdings(bad.as_bytes()), Err(TraitError::ParseError(_))));

        let negative = "portfolio_id,account,symbol,quantity,purchase_price,current_price,sector,asset_class,issuer\nP1,A,MSFT,1,,-5,,,\n";
        assert!(parse_holdings(negative.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_closes() {
        let csv = "symbol,date,close\nSPY,2024-01-03,470.1\nSPY,2024-01-02,472.6\nQQQ,2024-01-02,409.5\n";
        let closes = parse_closes(csv.as_bytes()).unwrap();
        assert_eq!(closes[&Symbol::new("SPY")].len(), 2);
        assert_eq!(closes[&Symbol::new("QQQ")][0].close, 409.5);
    }

    #[test]
    fn test_parse_securities() {
        let csv = "symbol,sector,asset_class,issuer,price\nJPM,Financials,Equity,JPMorgan Chase,198.2\nBND,,Fixed Income,,\n";
        let rows = parse_securities(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.sector.as_deref(), Some("Financials"));
        assert_eq!(rows[0].2, Some(dec!(198.2)));
        assert!(rows[1].1.sector.is_none());
        assert!(rows[1].2.is_none());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = InMemoryHoldingsStore::from_csv("/nonexistent/holdings.csv").unwrap_err();
        assert!(matches!(err, TraitError::NotFound(_)));
    }
}
