//! Historical volatility estimation.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::RiskConfig;
use crate::status::DataWarning;
use folio_core::{PriceSeries, Symbol};

/// Annualized historical volatility of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySnapshot {
    /// Symbol.
    pub symbol: Symbol,
    /// Valuation date the window ends on.
    pub as_of: NaiveDate,
    /// Lookback window in calendar days.
    pub lookback_days: u32,
    /// Annualized standard deviation of daily returns.
    pub annualized: f64,
    /// Return observations used.
    pub observations: usize,
    /// True when `annualized` is the configured default, not a measurement.
    pub is_estimate: bool,
}

impl VolatilitySnapshot {
    /// Daily standard deviation implied by the annual figure.
    #[must_use]
    pub fn daily(&self, trading_days_per_year: u32) -> f64 {
        self.annualized / f64::from(trading_days_per_year).sqrt()
    }
}

/// First date of the lookback window ending on `as_of`.
#[must_use]
pub fn window_start(as_of: NaiveDate, lookback_days: u32) -> NaiveDate {
    as_of - Duration::days(i64::from(lookback_days))
}

/// Annualized volatility `stddev(daily returns) × sqrt(trading days)`.
///
/// Never fails: with fewer than `config.min_observations` returns, or a
/// non-finite result, the configured default is used and the snapshot is
/// flagged as an estimate.
pub fn estimate_volatility(
    series: &PriceSeries,
    as_of: NaiveDate,
    config: &RiskConfig,
) -> (VolatilitySnapshot, Vec<DataWarning>) {
    let windowed = series.window(window_start(as_of, config.lookback_days), as_of);
    let returns = windowed.returns();
    let observations = returns.len();

    let mut warnings = Vec::new();
    let measured = if observations >= config.min_observations {
        let sd = returns.iter().std_dev();
        let annual = sd * f64::from(config.trading_days_per_year).sqrt();
        annual.is_finite().then_some(annual)
    } else {
        if series.is_empty() {
            warnings.push(DataWarning::MissingPriceHistory {
                symbol: series.symbol.clone(),
            });
        } else {
            warnings.push(DataWarning::ShortPriceHistory {
                symbol: series.symbol.clone(),
                observations,
                required: config.min_observations,
            });
        }
        None
    };

    let (annualized, is_estimate) = match measured {
        Some(v) => (v, false),
        None => {
            warnings.push(DataWarning::DefaultVolatility {
                symbol: series.symbol.clone(),
                volatility: config.default_volatility,
            });
            (config.default_volatility, true)
        }
    };

    let snapshot = VolatilitySnapshot {
        symbol: series.symbol.clone(),
        as_of,
        lookback_days: config.lookback_days,
        annualized,
        observations,
        is_estimate,
    };
    (snapshot, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use folio_core::PricePoint;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    /// Daily closes ending on `as_of`.
    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let n = closes.len() as i64;
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(as_of() - Duration::days(n - 1 - i as i64), *c))
            .collect();
        PriceSeries::new(symbol, points)
    }

    #[test]
    fn test_measured_volatility() {
        let closes: Vec<f64> = (0..60)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let s = series("AAA", &closes);
        let config = RiskConfig::default();

        let (snap, warnings) = estimate_volatility(&s, as_of(), &config);
        assert!(warnings.is_empty());
        assert!(!snap.is_estimate);
        assert_eq!(snap.observations, 59);

        let expected = s.returns().iter().std_dev() * 252f64.sqrt();
        assert_relative_eq!(snap.annualized, expected, epsilon = 1e-12);
        assert_relative_eq!(snap.daily(252), expected / 252f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_short_history_uses_default() {
        let s = series("BBB", &[100.0, 101.0, 99.0]);
        let config = RiskConfig::default().with_default_volatility(0.25);

        let (snap, warnings) = estimate_volatility(&s, as_of(), &config);
        assert!(snap.is_estimate);
        assert_relative_eq!(snap.annualized, 0.25);
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            warnings[0],
            DataWarning::ShortPriceHistory { observations: 2, required: 20, .. }
        ));
    }

    #[test]
    fn test_missing_history_uses_default() {
        let s = PriceSeries::empty("CCC");
        let (snap, warnings) = estimate_volatility(&s, as_of(), &RiskConfig::default());
        assert!(snap.is_estimate);
        assert_relative_eq!(snap.annualized, 0.20);
        assert!(matches!(warnings[0], DataWarning::MissingPriceHistory { .. }));
    }

    #[test]
    fn test_window_excludes_old_points() {
        let config = RiskConfig::default().with_lookback_days(10).with_min_observations(5);
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + f64::from(i)).collect();
        let s = series("DDD", &closes);

        let (snap, _) = estimate_volatility(&s, as_of(), &config);
        assert_eq!(snap.observations, 10);
    }
}
