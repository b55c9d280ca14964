//! Value at Risk (VaR) calculations.
//!
//! VaR estimates the potential loss over a specified time horizon
//! at a given confidence level.

mod monte_carlo;
mod parametric;

pub use monte_carlo::*;
pub use parametric::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::DataWarning;

/// VaR and expected shortfall at one confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VaREstimate {
    /// Confidence level (e.g., 0.95 for 95%)
    pub confidence_level: f64,
    /// Loss threshold, as a positive amount.
    pub var: Decimal,
    /// Mean loss in the tail beyond VaR.
    pub expected_shortfall: Decimal,
}

impl VaREstimate {
    /// A zero estimate, used for portfolios with nothing at risk.
    #[must_use]
    pub fn zero(confidence_level: f64) -> Self {
        Self {
            confidence_level,
            var: Decimal::ZERO,
            expected_shortfall: Decimal::ZERO,
        }
    }
}

/// Value at Risk result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaRResult {
    /// Method used for calculation
    pub method: VaRMethod,
    /// Time horizon in days
    pub horizon_days: u32,
    /// Portfolio value the estimates refer to.
    pub portfolio_value: Decimal,
    /// One estimate per requested confidence level, in request order.
    pub estimates: Vec<VaREstimate>,
    /// Simulation trials run (zero when no simulation was needed).
    pub iterations: usize,
    /// Simulation partitions.
    pub workers: usize,
    /// Master seed actually used, so any run can be replayed.
    pub seed: Option<u64>,
    /// Wall-clock time spent.
    pub elapsed_ms: u64,
    /// Degraded inputs behind this result.
    #[serde(default)]
    pub warnings: Vec<DataWarning>,
}

impl VaRResult {
    /// Estimate at `confidence_level`, if it was computed.
    #[must_use]
    pub fn at(&self, confidence_level: f64) -> Option<&VaREstimate> {
        self.estimates
            .iter()
            .find(|e| (e.confidence_level - confidence_level).abs() < 1e-12)
    }

    /// VaR at the first requested confidence level.
    #[must_use]
    pub fn var(&self) -> Decimal {
        self.estimates.first().map_or(Decimal::ZERO, |e| e.var)
    }

    /// True when the estimates rest on fallback inputs.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// VaR calculation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaRMethod {
    /// Parametric (variance-covariance)
    Parametric,
    /// Monte Carlo simulation
    MonteCarlo,
}

impl std::fmt::Display for VaRMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parametric => write!(f, "Parametric"),
            Self::MonteCarlo => write!(f, "Monte Carlo"),
        }
    }
}

impl std::fmt::Display for VaRResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} VaR ({}d):", self.method, self.horizon_days)?;
        for e in &self.estimates {
            write!(f, " {:.0}%=${:.2}", e.confidence_level * 100.0, e.var)?;
        }
        Ok(())
    }
}

/// Converts a currency amount to `Decimal`, rounded to cents.
pub(crate) fn money(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn result() -> VaRResult {
        VaRResult {
            method: VaRMethod::MonteCarlo,
            horizon_days: 1,
            portfolio_value: dec!(100000),
            estimates: vec![
                VaREstimate {
                    confidence_level: 0.95,
                    var: dec!(1500.25),
                    expected_shortfall: dec!(1900),
                },
                VaREstimate {
                    confidence_level: 0.99,
                    var: dec!(2100),
                    expected_shortfall: dec!(2400),
                },
            ],
            iterations: 10_000,
            workers: 8,
            seed: Some(42),
            elapsed_ms: 3,
            warnings: vec![],
        }
    }

    #[test]
    fn test_lookup_by_confidence() {
        let r = result();
        assert_eq!(r.at(0.99).unwrap().var, dec!(2100));
        assert!(r.at(0.90).is_none());
        assert_eq!(r.var(), dec!(1500.25));
        assert!(!r.is_degraded());
    }

    #[test]
    fn test_display() {
        let s = result().to_string();
        assert_eq!(s, "Monte Carlo VaR (1d): 95%=$1500.25 99%=$2100.00");
    }

    #[test]
    fn test_money_rounds_to_cents() {
        assert_eq!(money(1234.5678), dec!(1234.57));
        assert_eq!(money(f64::NAN), Decimal::ZERO);
    }
}
