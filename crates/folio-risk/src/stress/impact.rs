//! Scenario impact on a portfolio.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ScenarioDefinition;
use crate::cancel::CancelToken;
use crate::concentration::{effective_tags, TagMap};
use crate::error::RiskResult;
use folio_core::{Portfolio, ScenarioId};

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Scenario name.
    pub name: String,
    /// Historical event label.
    pub event: Option<String>,
    /// Loss in currency; negative when the scenario is a gain.
    pub loss: Decimal,
    /// Loss as percent of pre-shock value, `None` for a zero-value portfolio.
    pub loss_pct: Option<f64>,
    /// Portfolio value after the shock.
    pub stressed_value: Decimal,
    /// Days to regain the pre-shock value.
    pub recovery_days: Option<u32>,
}

/// Aggregate of a stress run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSummary {
    /// Per-scenario outcomes, in request order.
    pub results: Vec<ScenarioResult>,
    /// Worst single-scenario loss, floored at zero.
    pub max_drawdown: Decimal,
    /// Scenario that produced it.
    pub worst_scenario: Option<ScenarioId>,
    /// Recovery estimate of the worst scenario.
    pub recovery_days: Option<u32>,
    /// Worst loss per historical event label.
    pub losses_by_event: BTreeMap<String, Decimal>,
}

impl StressSummary {
    /// Summary of a run with no scenarios.
    pub fn empty() -> Self {
        Self::from_results(Vec::new())
    }

    /// Aggregates per-scenario results.
    pub fn from_results(results: Vec<ScenarioResult>) -> Self {
        let worst = results
            .iter()
            .fold(None::<&ScenarioResult>, |best, r| match best {
                Some(b) if b.loss >= r.loss => Some(b),
                _ => Some(r),
            });

        let mut losses_by_event: BTreeMap<String, Decimal> = BTreeMap::new();
        for r in &results {
            if let Some(event) = &r.event {
                let slot = losses_by_event.entry(event.clone()).or_insert(r.loss);
                if r.loss > *slot {
                    *slot = r.loss;
                }
            }
        }

        Self {
            max_drawdown: worst.map_or(Decimal::ZERO, |w| w.loss.max(Decimal::ZERO)),
            worst_scenario: worst.map(|w| w.scenario_id.clone()),
            recovery_days: worst.and_then(|w| w.recovery_days),
            losses_by_event,
            results,
        }
    }

    /// Loss for a historical event label, if one was run.
    pub fn loss_for_event(&self, event: &str) -> Option<Decimal> {
        self.losses_by_event.get(event).copied()
    }
}

/// Applies one scenario to every holding.
///
/// Loss is `−Σ shock × market value`; a shock of −1.0 wipes out the holding.
pub fn apply_scenario(
    portfolio: &Portfolio,
    tags: &TagMap,
    scenario: &ScenarioDefinition,
) -> ScenarioResult {
    let before = portfolio.total_value();
    let loss: Decimal = portfolio
        .holdings()
        .iter()
        .map(|h| {
            let shock = scenario.shock_for(&h.symbol, &effective_tags(h, tags));
            -Decimal::from_f64(shock).unwrap_or(Decimal::ZERO) * h.market_value()
        })
        .sum();

    let loss_pct = if before > Decimal::ZERO {
        (loss / before * Decimal::ONE_HUNDRED).to_f64()
    } else {
        None
    };

    ScenarioResult {
        scenario_id: scenario.id.clone(),
        name: scenario.name.clone(),
        event: scenario.event.clone(),
        loss: loss.round_dp(2),
        loss_pct,
        stressed_value: (before - loss).round_dp(2),
        recovery_days: scenario.recovery_days,
    }
}

/// Evaluates scenarios independently in parallel and keeps the worst.
///
/// Results are returned in scenario order. A tripped `cancel` token fails
/// the whole run.
pub fn run_stress_tests(
    portfolio: &Portfolio,
    tags: &TagMap,
    scenarios: &[&ScenarioDefinition],
    cancel: &CancelToken,
) -> RiskResult<StressSummary> {
    cancel.check()?;
    let results: Vec<ScenarioResult> = scenarios
        .par_iter()
        .map(|s| {
            cancel.check()?;
            Ok(apply_scenario(portfolio, tags, s))
        })
        .collect::<RiskResult<Vec<_>>>()?;
    cancel.check()?;
    Ok(StressSummary::from_results(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use chrono::NaiveDate;
    use folio_core::{Holding, PortfolioId};
    use rust_decimal_macros::dec;

    fn portfolio() -> Portfolio {
        let h = |sym: &str, value: Decimal, class: &str| {
            Holding::builder(sym)
                .quantity(dec!(10))
                .current_price(value / dec!(10))
                .asset_class(class)
                .build()
                .unwrap()
        };
        Portfolio::new(
            PortfolioId::new("P1"),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            vec![
                h("SPY", dec!(60000), "Equity"),
                h("AGG", dec!(40000), "Fixed Income"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_total_loss_equals_portfolio_value() {
        let wipeout = ScenarioDefinition::new("wipeout", "Total loss").with_default_shock(-1.0);
        let p = portfolio();
        let summary =
            run_stress_tests(&p, &TagMap::new(), &[&wipeout], &CancelToken::new()).unwrap();

        assert_eq!(summary.max_drawdown, p.total_value());
        assert_eq!(summary.results[0].stressed_value, Decimal::ZERO);
        assert_eq!(summary.results[0].loss_pct, Some(100.0));
    }

    #[test]
    fn test_worst_scenario_not_sum() {
        let p = portfolio();
        let crash = ScenarioDefinition::new("1987", "Black Monday")
            .with_event("1987")
            .with_asset_class_shock("Equity", -0.20)
            .with_recovery_days(400);
        let gfc = ScenarioDefinition::new("2008", "GFC")
            .with_event("2008")
            .with_asset_class_shock("Equity", -0.50)
            .with_asset_class_shock("Fixed Income", 0.05)
            .with_recovery_days(1400);

        let summary =
            run_stress_tests(&p, &TagMap::new(), &[&crash, &gfc], &CancelToken::new()).unwrap();

        assert_eq!(summary.results[0].loss, dec!(12000));
        assert_eq!(summary.results[1].loss, dec!(28000));
        assert_eq!(summary.max_drawdown, dec!(28000));
        assert_eq!(summary.worst_scenario, Some(ScenarioId::new("2008")));
        assert_eq!(summary.recovery_days, Some(1400));
        assert_eq!(summary.loss_for_event("1987"), Some(dec!(12000)));
        assert_eq!(summary.loss_for_event("2020"), None);
    }

    #[test]
    fn test_gain_only_scenario_has_zero_drawdown() {
        let rally = ScenarioDefinition::new("rally", "Rally").with_default_shock(0.10);
        let summary =
            run_stress_tests(&portfolio(), &TagMap::new(), &[&rally], &CancelToken::new()).unwrap();
        assert_eq!(summary.results[0].loss, dec!(-10000));
        assert_eq!(summary.max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn test_no_scenarios() {
        let summary = run_stress_tests(&portfolio(), &TagMap::new(), &[], &CancelToken::new()).unwrap();
        assert_eq!(summary, StressSummary::empty());
        assert!(summary.worst_scenario.is_none());
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let s = ScenarioDefinition::new("x", "x");
        let err = run_stress_tests(&portfolio(), &TagMap::new(), &[&s], &cancel).unwrap_err();
        assert_eq!(err, RiskError::Cancelled);
    }
}
