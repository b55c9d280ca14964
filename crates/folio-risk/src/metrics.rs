//! The risk metrics record.
//!
//! [`RiskMetrics`] is assembled once per computation by
//! [`RiskMetricsBuilder`] and never mutated afterwards. It serializes
//! cleanly, so callers can cache it by (portfolio id, as-of date).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::concentration::{ComplianceViolation, ConcentrationReport};
use crate::performance::PerformanceSummary;
use crate::status::{ComputationStatus, DataWarning, SubComputation};
use crate::stress::StressSummary;
use crate::var::{VaREstimate, VaRMethod, VaRResult};
use folio_core::PortfolioId;

/// Metadata of the simulation behind the VaR figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetadata {
    /// Method.
    pub method: VaRMethod,
    /// Trials.
    pub iterations: usize,
    /// Partitions.
    pub workers: usize,
    /// Master seed used.
    pub seed: Option<u64>,
    /// Wall-clock time.
    pub elapsed_ms: u64,
}

/// Everything the engine knows about one portfolio's risk at one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Unique id of this computation.
    pub computation_id: Uuid,
    /// Portfolio.
    pub portfolio_id: PortfolioId,
    /// Valuation date.
    pub as_of: NaiveDate,
    /// When the record was assembled.
    pub calculated_at: DateTime<Utc>,
    /// Total market value.
    pub total_value: Decimal,

    /// VaR horizon in days.
    pub horizon_days: u32,
    /// Monte Carlo VaR per confidence level.
    pub value_at_risk: Vec<VaREstimate>,
    /// Parametric VaR per confidence level.
    pub parametric_var: Vec<VaREstimate>,
    /// Simulation metadata, when a simulation ran.
    pub simulation: Option<SimulationMetadata>,

    /// Volatility, Sharpe, Sortino, beta, alpha.
    pub performance: PerformanceSummary,
    /// Stress results.
    pub stress: Option<StressSummary>,
    /// Concentration breakdown and violations.
    pub concentration: Option<ConcentrationReport>,

    /// Status of each sub-computation that was attempted.
    pub status: BTreeMap<SubComputation, ComputationStatus>,
    /// Degraded inputs, in the order they were found.
    pub warnings: Vec<DataWarning>,
}

impl RiskMetrics {
    /// Starts a record for `portfolio_id` at `as_of`.
    pub fn builder(portfolio_id: PortfolioId, as_of: NaiveDate) -> RiskMetricsBuilder {
        RiskMetricsBuilder::new(portfolio_id, as_of)
    }

    /// Monte Carlo VaR at `confidence_level`.
    pub fn var_at(&self, confidence_level: f64) -> Option<Decimal> {
        self.value_at_risk
            .iter()
            .find(|e| (e.confidence_level - confidence_level).abs() < 1e-12)
            .map(|e| e.var)
    }

    /// Worst stress loss, zero if no stress test ran.
    pub fn max_drawdown(&self) -> Decimal {
        self.stress.as_ref().map_or(Decimal::ZERO, |s| s.max_drawdown)
    }

    /// Recovery estimate of the worst stress scenario.
    pub fn recovery_days(&self) -> Option<u32> {
        self.stress.as_ref().and_then(|s| s.recovery_days)
    }

    /// Stress loss for a historical event label.
    pub fn stress_loss(&self, event: &str) -> Option<Decimal> {
        self.stress.as_ref().and_then(|s| s.loss_for_event(event))
    }

    /// Sector shares, empty if concentration was not analyzed.
    pub fn sector_concentration(&self) -> BTreeMap<String, f64> {
        self.concentration
            .as_ref()
            .map(|c| c.by_sector.clone())
            .unwrap_or_default()
    }

    /// Compliance violations.
    pub fn violations(&self) -> &[ComplianceViolation] {
        self.concentration
            .as_ref()
            .map(|c| c.violations.as_slice())
            .unwrap_or_default()
    }

    /// True if concentration was analyzed and no limit is breached.
    pub fn is_compliant(&self) -> bool {
        self.concentration
            .as_ref()
            .is_some_and(ConcentrationReport::is_compliant)
    }

    /// Number of violations.
    pub fn violation_count(&self) -> usize {
        self.violations().len()
    }

    /// Status of one sub-computation, if it was attempted.
    pub fn status_of(&self, part: SubComputation) -> Option<&ComputationStatus> {
        self.status.get(&part)
    }

    /// True if any attempted sub-computation did not complete cleanly.
    pub fn is_degraded(&self) -> bool {
        self.status.values().any(|s| !s.is_completed())
    }
}

/// Builder for [`RiskMetrics`].
#[derive(Debug, Clone)]
pub struct RiskMetricsBuilder {
    portfolio_id: PortfolioId,
    as_of: NaiveDate,
    total_value: Decimal,
    horizon_days: u32,
    value_at_risk: Vec<VaREstimate>,
    parametric_var: Vec<VaREstimate>,
    simulation: Option<SimulationMetadata>,
    performance: PerformanceSummary,
    stress: Option<StressSummary>,
    concentration: Option<ConcentrationReport>,
    status: BTreeMap<SubComputation, ComputationStatus>,
    warnings: Vec<DataWarning>,
}

impl RiskMetricsBuilder {
    /// Creates an empty builder.
    pub fn new(portfolio_id: PortfolioId, as_of: NaiveDate) -> Self {
        Self {
            portfolio_id,
            as_of,
            total_value: Decimal::ZERO,
            horizon_days: 1,
            value_at_risk: Vec::new(),
            parametric_var: Vec::new(),
            simulation: None,
            performance: PerformanceSummary::default(),
            stress: None,
            concentration: None,
            status: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Sets the total value.
    #[must_use]
    pub fn total_value(mut self, value: Decimal) -> Self {
        self.total_value = value;
        self
    }

    /// Records a Monte Carlo result.
    #[must_use]
    pub fn monte_carlo(mut self, result: VaRResult) -> Self {
        self.horizon_days = result.horizon_days;
        if result.iterations > 0 {
            self.simulation = Some(SimulationMetadata {
                method: result.method,
                iterations: result.iterations,
                workers: result.workers,
                seed: result.seed,
                elapsed_ms: result.elapsed_ms,
            });
        }
        self.value_at_risk = result.estimates;
        self.warnings.extend(result.warnings);
        self
    }

    /// Records parametric estimates.
    #[must_use]
    pub fn parametric(mut self, estimates: Vec<VaREstimate>) -> Self {
        self.parametric_var = estimates;
        self
    }

    /// Records performance figures.
    #[must_use]
    pub fn performance(mut self, performance: PerformanceSummary) -> Self {
        self.performance = performance;
        self
    }

    /// Records a stress run.
    #[must_use]
    pub fn stress(mut self, stress: StressSummary) -> Self {
        self.stress = Some(stress);
        self
    }

    /// Records a concentration report.
    #[must_use]
    pub fn concentration(mut self, report: ConcentrationReport) -> Self {
        self.concentration = Some(report);
        self
    }

    /// Records the status of a sub-computation.
    #[must_use]
    pub fn status(mut self, part: SubComputation, status: ComputationStatus) -> Self {
        self.status.insert(part, status);
        self
    }

    /// Adds warnings, skipping exact duplicates.
    #[must_use]
    pub fn warnings(mut self, warnings: impl IntoIterator<Item = DataWarning>) -> Self {
        for w in warnings {
            if !self.warnings.contains(&w) {
                self.warnings.push(w);
            }
        }
        self
    }

    /// Assembles the record.
    pub fn build(self) -> RiskMetrics {
        RiskMetrics {
            computation_id: Uuid::new_v4(),
            portfolio_id: self.portfolio_id,
            as_of: self.as_of,
            calculated_at: Utc::now(),
            total_value: self.total_value,
            horizon_days: self.horizon_days,
            value_at_risk: self.value_at_risk,
            parametric_var: self.parametric_var,
            simulation: self.simulation,
            performance: self.performance,
            stress: self.stress,
            concentration: self.concentration,
            status: self.status,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::ScenarioResult;
    use folio_core::ScenarioId;
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn test_empty_record() {
        let m = RiskMetrics::builder(PortfolioId::new("P1"), as_of()).build();
        assert_eq!(m.max_drawdown(), Decimal::ZERO);
        assert!(m.sector_concentration().is_empty());
        assert!(!m.is_compliant());
        assert!(!m.is_degraded());
        assert!(m.var_at(0.95).is_none());
    }

    #[test]
    fn test_builder_collects_parts() {
        let var = VaRResult {
            method: VaRMethod::MonteCarlo,
            horizon_days: 10,
            portfolio_value: dec!(100),
            estimates: vec![VaREstimate {
                confidence_level: 0.95,
                var: dec!(5),
                expected_shortfall: dec!(6),
            }],
            iterations: 100,
            workers: 4,
            seed: Some(9),
            elapsed_ms: 1,
            warnings: vec![],
        };
        let stress = StressSummary::from_results(vec![ScenarioResult {
            scenario_id: ScenarioId::new("2020"),
            name: "COVID".into(),
            event: Some("2020".into()),
            loss: dec!(34),
            loss_pct: Some(34.0),
            stressed_value: dec!(66),
            recovery_days: Some(150),
        }]);
        let warning = DataWarning::UnknownScenario {
            scenario: ScenarioId::new("x"),
        };

        let m = RiskMetrics::builder(PortfolioId::new("P1"), as_of())
            .total_value(dec!(100))
            .monte_carlo(var)
            .stress(stress)
            .status(SubComputation::ValueAtRisk, ComputationStatus::Completed)
            .status(
                SubComputation::StressTest,
                ComputationStatus::from_warnings([&warning]),
            )
            .warnings(vec![warning.clone(), warning])
            .build();

        assert_eq!(m.horizon_days, 10);
        assert_eq!(m.var_at(0.95), Some(dec!(5)));
        assert_eq!(m.simulation.as_ref().unwrap().seed, Some(9));
        assert_eq!(m.max_drawdown(), dec!(34));
        assert_eq!(m.recovery_days(), Some(150));
        assert_eq!(m.stress_loss("2020"), Some(dec!(34)));
        assert_eq!(m.warnings.len(), 1);
        assert!(m.is_degraded());
    }

    #[test]
    fn test_serde_roundtrip_preserves_record() {
        let m = RiskMetrics::builder(PortfolioId::new("P1"), as_of())
            .total_value(dec!(1234.56))
            .build();
        let json = serde_json::to_string(&m).unwrap();
        let back: RiskMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
