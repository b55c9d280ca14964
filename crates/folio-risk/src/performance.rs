//! Portfolio performance figures.
//!
//! Ratios are computed from the value-weighted daily return series of the
//! current holdings over the lookback window. Anything that cannot be
//! estimated (too few observations, zero dispersion) is `None`.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use nalgebra::DMatrix;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::returns::{align_pair, weighted_returns, DatedReturns};
use crate::var::dollar_volatility;
use folio_core::{PriceSeries, Symbol};

/// Performance and market-sensitivity figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Annualized portfolio volatility.
    pub volatility: Option<f64>,
    /// Sharpe ratio.
    pub sharpe_ratio: Option<f64>,
    /// Sortino ratio.
    pub sortino_ratio: Option<f64>,
    /// Beta against the benchmark.
    pub beta: Option<f64>,
    /// Jensen's alpha, annualized.
    pub alpha: Option<f64>,
    /// Daily portfolio return observations behind the ratios.
    pub observations: usize,
}

/// Annualized portfolio volatility `sqrt(wᵀ Σ w) / V`.
///
/// `None` when the total exposure is not positive.
pub fn portfolio_volatility(
    exposures: &[f64],
    volatilities: &[f64],
    correlation: &DMatrix<f64>,
) -> Option<f64> {
    let total: f64 = exposures.iter().sum();
    if !(total > 0.0) {
        return None;
    }
    let sigma = dollar_volatility(exposures, volatilities, correlation).ok()?;
    Some(sigma / total)
}

/// Value-weighted daily returns of the current holdings.
///
/// Symbols without usable history are left out and the remaining weights
/// renormalized. Only dates on which every included symbol has a return are
/// kept.
pub fn portfolio_returns(
    exposures: &BTreeMap<Symbol, Decimal>,
    series: &HashMap<Symbol, PriceSeries>,
    from: NaiveDate,
    to: NaiveDate,
) -> DatedReturns {
    let components: Vec<(f64, DatedReturns)> = exposures
        .iter()
        .filter_map(|(symbol, value)| {
            let r = series.get(symbol)?.window(from, to).dated_returns();
            let w = value.to_f64()?;
            (!r.is_empty() && w != 0.0).then_some((w, r))
        })
        .collect();

    let total: f64 = components.iter().map(|(w, _)| w).sum();
    if total == 0.0 || !total.is_finite() {
        return Vec::new();
    }

    let weighted: Vec<(f64, &[(NaiveDate, f64)])> = components
        .iter()
        .map(|(w, r)| (w / total, r.as_slice()))
        .collect();
    weighted_returns(&weighted)
}

/// Annualized Sharpe ratio `(μ·T − r_f) / (σ·√T)`.
pub fn sharpe_ratio(daily_returns: &[f64], risk_free_rate: f64, trading_days: u32) -> Option<f64> {
    if daily_returns.len() < 2 {
        return None;
    }
    let t = f64::from(trading_days);
    let sd = daily_returns.iter().std_dev();
    if !(sd > 0.0) {
        return None;
    }
    let excess = daily_returns.iter().mean() * t - risk_free_rate;
    finite(excess / (sd * t.sqrt()))
}

/// Annualized Sortino ratio using downside deviation below the daily
/// risk-free rate.
pub fn sortino_ratio(daily_returns: &[f64], risk_free_rate: f64, trading_days: u32) -> Option<f64> {
    if daily_returns.len() < 2 {
        return None;
    }
    let t = f64::from(trading_days);
    let rf_daily = risk_free_rate / t;
    let downside = daily_returns
        .iter()
        .map(|r| (r - rf_daily).min(0.0).powi(2))
        .sum::<f64>()
        / daily_returns.len() as f64;
    let dd = downside.sqrt();
    if !(dd > 0.0) {
        return None;
    }
    let excess = daily_returns.iter().mean() * t - risk_free_rate;
    finite(excess / (dd * t.sqrt()))
}

/// Beta `Cov(r_p, r_b) / Var(r_b)` over common dates.
///
/// `None` with fewer than `min_observations` common dates or a flat benchmark.
pub fn beta(
    portfolio: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
    min_observations: usize,
) -> Option<f64> {
    let (rp, rb) = align_pair(portfolio, benchmark);
    if rp.len() < min_observations.max(2) {
        return None;
    }
    let var_b = rb.iter().variance();
    if !(var_b > 0.0) {
        return None;
    }
    finite(rp.iter().covariance(rb.iter()) / var_b)
}

/// Jensen's alpha `R_p − (r_f + β (R_b − r_f))` on annualized mean returns
/// over common dates.
pub fn jensen_alpha(
    portfolio: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
    beta: f64,
    risk_free_rate: f64,
    trading_days: u32,
) -> Option<f64> {
    let (rp, rb) = align_pair(portfolio, benchmark);
    if rp.is_empty() {
        return None;
    }
    let t = f64::from(trading_days);
    let annual_p = rp.iter().mean() * t;
    let annual_b = rb.iter().mean() * t;
    finite(annual_p - (risk_free_rate + beta * (annual_b - risk_free_rate)))
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use folio_core::PricePoint;
    use rust_decimal_macros::dec;

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn dated(returns: &[f64]) -> DatedReturns {
        returns
            .iter()
            .enumerate()
            .map(|(i, r)| (d0() + Duration::days(i as i64 + 1), *r))
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.0005 + 0.01 * ((i as f64) * 1.3).sin()).collect()
    }

    #[test]
    fn test_beta_of_scaled_series() {
        let bench = dated(&wave(100));
        let port: DatedReturns = bench.iter().map(|(d, r)| (*d, 1.5 * r)).collect();
        assert_relative_eq!(beta(&port, &bench, 20).unwrap(), 1.5, epsilon = 1e-10);

        let alpha = jensen_alpha(&port, &bench, 1.5, 0.0, 252).unwrap();
        assert_relative_eq!(alpha, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_beta_not_applicable() {
        let bench = dated(&[0.0; 30]);
        let port = dated(&wave(30));
        assert!(beta(&port, &bench, 20).is_none(), "flat benchmark");

        let short = dated(&wave(10));
        assert!(beta(&short, &short, 20).is_none(), "too short");
    }

    #[test]
    fn test_sharpe_and_sortino() {
        let r = wave(250);
        let sharpe = sharpe_ratio(&r, 0.0, 252).unwrap();
        let expected = r.iter().mean() * 252.0 / (r.iter().std_dev() * 252f64.sqrt());
        assert_relative_eq!(sharpe, expected, epsilon = 1e-12);

        let sortino = sortino_ratio(&r, 0.0, 252).unwrap();
        assert!(sortino > sharpe, "downside deviation is below full deviation");

        assert!(sharpe_ratio(&[0.01, 0.01, 0.01], 0.0, 252).is_none());
        assert!(sortino_ratio(&[0.01, 0.02], 0.0, 252).is_none());
    }

    #[test]
    fn test_portfolio_volatility_single_asset() {
        let vol = portfolio_volatility(&[1000.0], &[0.25], &DMatrix::identity(1, 1)).unwrap();
        assert_relative_eq!(vol, 0.25);
        assert!(portfolio_volatility(&[], &[], &DMatrix::zeros(0, 0)).is_none());
    }

    #[test]
    fn test_portfolio_returns_weighting() {
        let series = |sym: &str, closes: &[f64]| {
            let pts = closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(d0() + Duration::days(i as i64), *c))
                .collect();
            PriceSeries::new(sym, pts)
        };
        let mut map = HashMap::new();
        map.insert(Symbol::new("A"), series("A", &[100.0, 110.0]));
        map.insert(Symbol::new("B"), series("B", &[50.0, 45.0]));

        let mut exposures = BTreeMap::new();
        exposures.insert(Symbol::new("A"), dec!(75));
        exposures.insert(Symbol::new("B"), dec!(25));
        exposures.insert(Symbol::new("C"), dec!(100));

        let r = portfolio_returns(&exposures, &map, d0(), d0() + Duration::days(5));
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0].1, 0.75 * 0.10 + 0.25 * -0.10, epsilon = 1e-12);
    }
}
