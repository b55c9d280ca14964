//! Stress command implementation.
//!
//! Applies configured historical scenarios to the portfolio.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use folio_core::ScenarioId;
use folio_risk::ScenarioResult;

use crate::cli::{Context, OutputFormat};
use crate::commands::{engine_for, DataArgs};
use crate::output::{
    format_money, format_pct, print_data_warnings, print_header, print_json, print_output,
    print_warning, KeyValue,
};

/// Arguments for the stress command.
#[derive(Args, Debug)]
pub struct StressArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Scenario id to run (repeatable). Runs every scenario when omitted.
    #[arg(short = 's', long = "scenario")]
    pub scenarios: Vec<String>,
}

/// One scenario row.
#[derive(Debug, Serialize, Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Loss")]
    loss: String,
    #[tabled(rename = "Loss %")]
    loss_pct: String,
    #[tabled(rename = "Stressed Value")]
    stressed_value: String,
    #[tabled(rename = "Recovery (days)")]
    recovery_days: String,
}

impl From<&ScenarioResult> for ScenarioRow {
    fn from(r: &ScenarioResult) -> Self {
        Self {
            scenario: r.scenario_id.to_string(),
            name: r.name.clone(),
            loss: format_money(r.loss),
            loss_pct: r.loss_pct.map_or_else(|| "n/a".to_string(), format_pct),
            stressed_value: format_money(r.stressed_value),
            recovery_days: r
                .recovery_days
                .map_or_else(|| "-".to_string(), |d| d.to_string()),
        }
    }
}

/// Execute the stress command.
pub async fn execute(args: StressArgs, ctx: &Context) -> Result<()> {
    let engine = engine_for(&args.data, ctx)?;
    if engine.config().scenarios.is_empty() {
        print_warning("No stress scenarios configured; pass --config with a scenario library");
    }

    let ids: Vec<ScenarioId> = args.scenarios.iter().map(|s| ScenarioId::new(s.as_str())).collect();
    let metrics = engine
        .run_stress_tests(&args.data.portfolio_id(), &ids)
        .await?;

    if ctx.format == OutputFormat::Json {
        return print_json(&metrics.stress);
    }

    if let Some(stress) = &metrics.stress {
        let rows: Vec<ScenarioRow> = stress.results.iter().map(ScenarioRow::from).collect();
        print_header("Stress Scenarios");
        print_output(&rows, ctx.format)?;

        let summary = vec![
            KeyValue::money("Portfolio Value", metrics.total_value),
            KeyValue::money("Max Drawdown", stress.max_drawdown),
            KeyValue::new(
                "Worst Scenario",
                stress
                    .worst_scenario
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
            ),
            KeyValue::new(
                "Recovery (days)",
                stress
                    .recovery_days
                    .map_or_else(|| "-".to_string(), |d| d.to_string()),
            ),
        ];
        print_header("Summary");
        print_output(&summary, ctx.format)?;
    }
    print_data_warnings(&metrics.warnings, ctx);
    Ok(())
}
