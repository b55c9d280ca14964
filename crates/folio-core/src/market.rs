//! Market data value types: daily close series and security classification tags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::Symbol;

/// Bucket name used when a classification tag could not be resolved.
///
/// Holdings with unresolved tags are grouped here rather than dropped, so
/// bucket percentages still sum to 100%.
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// A single daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: f64,
}

impl PricePoint {
    /// Creates a new price point.
    #[must_use]
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Ordered series of daily closes for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Symbol the series belongs to.
    pub symbol: Symbol,
    /// Points in ascending date order, one per date.
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Creates a series, sorting points by date and keeping the last close
    /// reported for any duplicated date. Non-finite or non-positive closes are
    /// discarded.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite() && p.close > 0.0);
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            symbol: symbol.into(),
            points: deduped,
        }
    }

    /// Creates an empty series.
    #[must_use]
    pub fn empty(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            points: Vec::new(),
        }
    }

    /// Returns the points in ascending date order.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of closes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series has no closes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent close, if any.
    #[must_use]
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Simple daily returns `p[t] / p[t-1] - 1`, keyed by the later date.
    #[must_use]
    pub fn dated_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
            .collect()
    }

    /// Simple daily returns without dates.
    #[must_use]
    pub fn returns(&self) -> Vec<f64> {
        self.dated_returns().into_iter().map(|(_, r)| r).collect()
    }

    /// Restricts the series to `[from, to]` inclusive.
    #[must_use]
    pub fn window(&self, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= from && p.date <= to)
                .copied()
                .collect(),
        }
    }
}

/// Classification tags for a security, resolved from the security master.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityTags {
    /// Industry sector (e.g. "Technology").
    pub sector: Option<String>,
    /// Asset class (e.g. "Equity", "Fixed Income").
    pub asset_class: Option<String>,
    /// Issuer name.
    pub issuer: Option<String>,
}

impl SecurityTags {
    /// Creates empty (unresolved) tags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sector.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Sets the asset class.
    #[must_use]
    pub fn with_asset_class(mut self, asset_class: impl Into<String>) -> Self {
        self.asset_class = Some(asset_class.into());
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sector bucket, falling back to [`UNKNOWN_BUCKET`].
    #[must_use]
    pub fn sector_bucket(&self) -> &str {
        bucket(self.sector.as_deref())
    }

    /// Asset class bucket, falling back to [`UNKNOWN_BUCKET`].
    #[must_use]
    pub fn asset_class_bucket(&self) -> &str {
        bucket(self.asset_class.as_deref())
    }

    /// Issuer bucket, falling back to [`UNKNOWN_BUCKET`].
    #[must_use]
    pub fn issuer_bucket(&self) -> &str {
        bucket(self.issuer.as_deref())
    }

    /// Returns true if every tag is resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sector.is_some() && self.asset_class.is_some() && self.issuer.is_some()
    }

    /// Fills unresolved tags from `other`, keeping tags already set here.
    #[must_use]
    pub fn merged_with(mut self, other: &SecurityTags) -> Self {
        if self.sector.is_none() {
            self.sector.clone_from(&other.sector);
        }
        if self.asset_class.is_none() {
            self.asset_class.clone_from(&other.asset_class);
        }
        if self.issuer.is_none() {
            self.issuer.clone_from(&other.issuer);
        }
        self
    }
}

fn bucket(tag: Option<&str>) -> &str {
    match tag {
        Some(t) if !t.trim().is_empty() => t,
        _ => UNKNOWN_BUCKET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_series_sorted_and_deduped() {
        let series = PriceSeries::new(
            "AAPL",
            vec![
                PricePoint::new(d(3), 102.0),
                PricePoint::new(d(1), 100.0),
                PricePoint::new(d(2), 101.0),
                PricePoint::new(d(2), 101.5),
                PricePoint::new(d(4), -1.0),
            ],
        );

        assert_eq!(series.len(), 3);
        assert_eq!(series.points()[0].date, d(1));
        assert_relative_eq!(series.points()[1].close, 101.5);
        assert_eq!(series.last_close(), Some(102.0));
    }

    #[test]
    fn test_returns() {
        let series = PriceSeries::new(
            "AAPL",
            vec![PricePoint::new(d(1), 100.0), PricePoint::new(d(2), 110.0), PricePoint::new(d(3), 99.0)],
        );

        let returns = series.returns();
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);

        let dated = series.dated_returns();
        assert_eq!(dated[0].0, d(2));
    }

    #[test]
    fn test_empty_series_has_no_returns() {
        let series = PriceSeries::empty("X");
        assert!(series.is_empty());
        assert!(series.returns().is_empty());
        assert!(PriceSeries::new("X", vec![PricePoint::new(d(1), 5.0)]).returns().is_empty());
    }

    #[test]
    fn test_window() {
        let series = PriceSeries::new(
            "AAPL",
            (1..=10).map(|i| PricePoint::new(d(i), 100.0 + f64::from(i))).collect(),
        );
        let w = series.window(d(3), d(5));
        assert_eq!(w.len(), 3);
        assert_eq!(w.points()[0].date, d(3));
    }

    #[test]
    fn test_tag_buckets() {
        let tags = SecurityTags::new().with_sector("Technology");
        assert_eq!(tags.sector_bucket(), "Technology");
        assert_eq!(tags.asset_class_bucket(), UNKNOWN_BUCKET);
        assert_eq!(SecurityTags::new().with_issuer("  ").issuer_bucket(), UNKNOWN_BUCKET);
        assert!(!tags.is_complete());
    }

    #[test]
    fn test_tag_merge() {
        let preset = SecurityTags::new().with_sector("Energy");
        let resolved = SecurityTags::new()
            .with_sector("Utilities")
            .with_asset_class("Equity")
            .with_issuer("Exxon");

        let merged = preset.merged_with(&resolved);
        assert_eq!(merged.sector.as_deref(), Some("Energy"));
        assert_eq!(merged.asset_class.as_deref(), Some("Equity"));
        assert!(merged.is_complete());
    }
}
