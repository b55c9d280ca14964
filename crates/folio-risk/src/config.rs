//! Risk calculation configuration.
//!
//! Defaults follow common desk practice: 95%/99% one-day VaR from 10,000
//! trials, one year of daily history, and a 30% sector concentration limit.

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use folio_core::Symbol;

// =============================================================================
// VALIDATION
// =============================================================================

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref rule) = self.rule {
            write!(f, "{}: {} (rule: {})", self.field, self.message, rule)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Validates the configuration.
    ///
    /// Returns a list of validation errors, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns an error if invalid.
    fn validate_or_error(&self) -> RiskResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(RiskError::InvalidConfig(joined))
    }
}

/// Checks that `c` is a usable confidence level.
pub fn check_confidence(c: f64) -> RiskResult<()> {
    if c.is_finite() && c > 0.0 && c < 1.0 {
        Ok(())
    } else {
        Err(RiskError::invalid_input(format!(
            "confidence level must be strictly between 0 and 1, got {c}"
        )))
    }
}

// =============================================================================
// CONCENTRATION LIMITS
// =============================================================================

/// Concentration limits, as percentages of total portfolio value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationLimits {
    /// Maximum share of any single sector.
    #[serde(default = "default_sector_limit")]
    pub sector: f64,

    /// Maximum share of any single asset class.
    #[serde(default = "default_asset_class_limit")]
    pub asset_class: f64,

    /// Maximum share of any single issuer.
    #[serde(default = "default_issuer_limit")]
    pub issuer: f64,

    /// Maximum share of any single position (summed across accounts).
    #[serde(default = "default_single_position_limit")]
    pub single_position: f64,
}

fn default_sector_limit() -> f64 {
    30.0
}

fn default_asset_class_limit() -> f64 {
    60.0
}

fn default_issuer_limit() -> f64 {
    10.0
}

fn default_single_position_limit() -> f64 {
    20.0
}

impl Default for ConcentrationLimits {
    fn default() -> Self {
        Self {
            sector: default_sector_limit(),
            asset_class: default_asset_class_limit(),
            issuer: default_issuer_limit(),
            single_position: default_single_position_limit(),
        }
    }
}

impl ConcentrationLimits {
    /// Sets the sector limit.
    #[must_use]
    pub fn with_sector(mut self, pct: f64) -> Self {
        self.sector = pct;
        self
    }

    /// Sets the asset class limit.
    #[must_use]
    pub fn with_asset_class(mut self, pct: f64) -> Self {
        self.asset_class = pct;
        self
    }

    /// Sets the issuer limit.
    #[must_use]
    pub fn with_issuer(mut self, pct: f64) -> Self {
        self.issuer = pct;
        self
    }

    /// Sets the single position limit.
    #[must_use]
    pub fn with_single_position(mut self, pct: f64) -> Self {
        self.single_position = pct;
        self
    }
}

impl Validate for ConcentrationLimits {
    fn validate(&self) -> Vec<ValidationError> {
        [
            ("concentration_limits.sector", self.sector),
            ("concentration_limits.asset_class", self.asset_class),
            ("concentration_limits.issuer", self.issuer),
            ("concentration_limits.single_position", self.single_position),
        ]
        .into_iter()
        .filter(|(_, v)| !(v.is_finite() && *v > 0.0 && *v <= 100.0))
        .map(|(field, _)| {
            ValidationError::with_rule(field, "Limit must be in (0, 100]", "valid_percentage")
        })
        .collect()
    }
}

// =============================================================================
// RISK CONFIGURATION
// =============================================================================

/// Configuration for a risk computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Confidence levels reported in every VaR computation.
    #[serde(default = "default_confidence_levels")]
    pub confidence_levels: Vec<f64>,

    /// Monte Carlo trial count.
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// VaR horizon in trading days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Number of simulation partitions.
    ///
    /// Fixed rather than derived from the thread pool, so a seeded run
    /// produces the same trials on any machine.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Master seed. `None` draws one from OS entropy per run.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Calendar days of price history fetched for statistics.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Minimum return observations before a statistic falls back to defaults.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    /// Annualized volatility assumed when history is insufficient.
    #[serde(default = "default_volatility")]
    pub default_volatility: f64,

    /// Trading days per year used for annualization.
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,

    /// Concentration limits.
    #[serde(default)]
    pub concentration_limits: ConcentrationLimits,

    /// Annual risk-free rate for Sharpe, Sortino and alpha.
    #[serde(default)]
    pub risk_free_rate: f64,

    /// Benchmark for beta. `None` skips beta in full metric runs.
    #[serde(default)]
    pub benchmark_symbol: Option<Symbol>,
}

fn default_confidence_levels() -> Vec<f64> {
    vec![0.95, 0.99]
}

fn default_iterations() -> usize {
    10_000
}

fn default_horizon_days() -> u32 {
    1
}

fn default_workers() -> usize {
    8
}

fn default_lookback_days() -> u32 {
    252
}

fn default_min_observations() -> usize {
    20
}

fn default_volatility() -> f64 {
    0.20
}

fn default_trading_days() -> u32 {
    252
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            confidence_levels: default_confidence_levels(),
            iterations: default_iterations(),
            horizon_days: default_horizon_days(),
            workers: default_workers(),
            seed: None,
            lookback_days: default_lookback_days(),
            min_observations: default_min_observations(),
            default_volatility: default_volatility(),
            trading_days_per_year: default_trading_days(),
            concentration_limits: ConcentrationLimits::default(),
            risk_free_rate: 0.0,
            benchmark_symbol: None,
        }
    }
}

impl RiskConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the confidence levels.
    #[must_use]
    pub fn with_confidence_levels(mut self, levels: Vec<f64>) -> Self {
        self.confidence_levels = levels;
        self
    }

    /// Sets the trial count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the horizon.
    #[must_use]
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    /// Sets the number of simulation partitions.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Fixes the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the lookback window.
    #[must_use]
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Sets the minimum observation count.
    #[must_use]
    pub fn with_min_observations(mut self, n: usize) -> Self {
        self.min_observations = n;
        self
    }

    /// Sets the fallback volatility.
    #[must_use]
    pub fn with_default_volatility(mut self, vol: f64) -> Self {
        self.default_volatility = vol;
        self
    }

    /// Sets the concentration limits.
    #[must_use]
    pub fn with_concentration_limits(mut self, limits: ConcentrationLimits) -> Self {
        self.concentration_limits = limits;
        self
    }

    /// Sets the annual risk-free rate.
    #[must_use]
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Sets the benchmark symbol.
    #[must_use]
    pub fn with_benchmark(mut self, symbol: impl Into<Symbol>) -> Self {
        self.benchmark_symbol = Some(symbol.into());
        self
    }

    /// Horizon scaling factor `sqrt(h / trading_days)` applied to annual volatility.
    #[must_use]
    pub fn horizon_scale(&self, horizon_days: u32) -> f64 {
        (f64::from(horizon_days) / f64::from(self.trading_days_per_year)).sqrt()
    }
}

impl Validate for RiskConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.confidence_levels.is_empty() {
            errors.push(ValidationError::new(
                "confidence_levels",
                "At least one confidence level is required",
            ));
        }
        if self
            .confidence_levels
            .iter()
            .any(|c| check_confidence(*c).is_err())
        {
            errors.push(ValidationError::with_rule(
                "confidence_levels",
                "Confidence levels must be strictly between 0 and 1",
                "valid_confidence",
            ));
        }

        if self.iterations == 0 {
            errors.push(ValidationError::with_rule(
                "iterations",
                "Iteration count must be at least 1",
                "positive_iterations",
            ));
        }

        if self.horizon_days == 0 {
            errors.push(ValidationError::with_rule(
                "horizon_days",
                "Horizon must be at least one day",
                "positive_horizon",
            ));
        }

        if self.workers == 0 {
            errors.push(ValidationError::with_rule(
                "workers",
                "Worker count must be at least 1",
                "positive_workers",
            ));
        }

        if self.lookback_days == 0 {
            errors.push(ValidationError::new(
                "lookback_days",
                "Lookback must be at least one day",
            ));
        }

        if self.min_observations < 2 {
            errors.push(ValidationError::with_rule(
                "min_observations",
                "At least two observations are needed for a standard deviation",
                "min_two_observations",
            ));
        }

        if !(self.default_volatility.is_finite() && self.default_volatility >= 0.0) {
            errors.push(ValidationError::new(
                "default_volatility",
                "Default volatility must be a non-negative number",
            ));
        }

        if self.trading_days_per_year == 0 {
            errors.push(ValidationError::new(
                "trading_days_per_year",
                "Trading days per year must be positive",
            ));
        }

        if !self.risk_free_rate.is_finite() {
            errors.push(ValidationError::new(
                "risk_free_rate",
                "Risk-free rate must be finite",
            ));
        }

        errors.extend(self.concentration_limits.validate());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = RiskConfig::default();
        assert!(config.is_valid(), "{:?}", config.validate());
        assert_eq!(config.confidence_levels, vec![0.95, 0.99]);
        assert_eq!(config.iterations, 10_000);
        assert_relative_eq!(config.concentration_limits.sector, 30.0);
    }

    #[test]
    fn test_invalid_values_collected() {
        let config = RiskConfig::default()
            .with_confidence_levels(vec![0.95, 1.0])
            .with_iterations(0)
            .with_workers(0)
            .with_concentration_limits(ConcentrationLimits::default().with_sector(0.0));

        let errors = config.validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"confidence_levels"));
        assert!(fields.contains(&"iterations"));
        assert!(fields.contains(&"workers"));
        assert!(fields.contains(&"concentration_limits.sector"));

        let err = config.validate_or_error().unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig(_)));
    }

    #[test]
    fn test_horizon_scale() {
        let config = RiskConfig::default();
        assert_relative_eq!(config.horizon_scale(252), 1.0);
        assert_relative_eq!(config.horizon_scale(1), (1.0f64 / 252.0).sqrt());
    }

    #[test]
    fn test_check_confidence() {
        assert!(check_confidence(0.95).is_ok());
        assert!(check_confidence(0.0).is_err());
        assert!(check_confidence(1.0).is_err());
        assert!(check_confidence(f64::NAN).is_err());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::with_rule("iterations", "must be positive", "positive");
        assert_eq!(err.to_string(), "iterations: must be positive (rule: positive)");
    }
}
