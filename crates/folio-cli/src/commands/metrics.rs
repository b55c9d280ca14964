//! Metrics command implementation.
//!
//! Computes the full risk record: VaR tiers, parametric cross-check,
//! performance, stress and concentration.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use folio_risk::{ComputationStatus, RiskMetrics};

use crate::cli::{Context, OutputFormat};
use crate::commands::{engine_for, interrupt_token, DataArgs};
use crate::output::{
    format_ratio, print_data_warnings, print_header, print_json, print_output, KeyValue,
};

/// Arguments for the metrics command.
#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

/// Status of one sub-computation.
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Computation")]
    part: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn status_label(status: &ComputationStatus) -> String {
    match status {
        ComputationStatus::Completed => "completed".to_string(),
        ComputationStatus::Degraded(reasons) => format!("degraded ({})", reasons.len()),
        ComputationStatus::Failed(reason) => format!("failed: {reason}"),
    }
}

fn summary_rows(metrics: &RiskMetrics) -> Vec<KeyValue> {
    let mut rows = vec![
        KeyValue::new("Portfolio", metrics.portfolio_id.to_string()),
        KeyValue::new("As Of", metrics.as_of.to_string()),
        KeyValue::money("Total Value", metrics.total_value),
    ];

    for estimate in &metrics.value_at_risk {
        let level = estimate.confidence_level * 100.0;
        rows.push(KeyValue::money(format!("VaR {level:.1}%"), estimate.var));
        rows.push(KeyValue::money(format!("ES {level:.1}%"), estimate.expected_shortfall));
    }
    for estimate in &metrics.parametric_var {
        let level = estimate.confidence_level * 100.0;
        rows.push(KeyValue::money(format!("Parametric VaR {level:.1}%"), estimate.var));
    }

    let p = &metrics.performance;
    rows.push(KeyValue::new("Volatility", format_ratio(p.volatility)));
    rows.push(KeyValue::new("Sharpe", format_ratio(p.sharpe_ratio)));
    rows.push(KeyValue::new("Sortino", format_ratio(p.sortino_ratio)));
    rows.push(KeyValue::new("Beta", format_ratio(p.beta)));
    rows.push(KeyValue::new("Alpha", format_ratio(p.alpha)));

    rows.push(KeyValue::money("Max Drawdown", metrics.max_drawdown()));
    if let Some(days) = metrics.recovery_days() {
        rows.push(KeyValue::new("Recovery (days)", days.to_string()));
    }
    if let Some(stress) = &metrics.stress {
        for (event, loss) in &stress.losses_by_event {
            rows.push(KeyValue::money(format!("Stress Loss {event}"), *loss));
        }
    }
    rows.push(KeyValue::new("Violations", metrics.violation_count().to_string()));
    rows
}

/// Execute the metrics command.
pub async fn execute(args: MetricsArgs, ctx: &Context) -> Result<()> {
    let engine = engine_for(&args.data, ctx)?;
    let metrics = engine
        .compute_risk_metrics(&args.data.portfolio_id(), &interrupt_token())
        .await?;

    if ctx.format == OutputFormat::Json {
        return print_json(&metrics);
    }

    print_header("Risk Metrics");
    print_output(&summary_rows(&metrics), ctx.format)?;

    let statuses: Vec<StatusRow> = metrics
        .status
        .iter()
        .map(|(part, status)| StatusRow {
            part: part.to_string(),
            status: status_label(status),
        })
        .collect();
    print_header("Computation Status");
    print_output(&statuses, ctx.format)?;

    print_data_warnings(&metrics.warnings, ctx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use folio_core::PortfolioId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_rows_for_empty_record() {
        let metrics = RiskMetrics::builder(
            PortfolioId::new("P1"),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        )
        .total_value(dec!(1000))
        .build();

        let rows = summary_rows(&metrics);
        assert_eq!(rows[0].value, "P1");
        assert_eq!(rows[2].value, "1000.00");
        assert!(rows.iter().any(|r| r.key == "Beta" && r.value == "n/a"));
        assert_eq!(rows.last().unwrap().value, "0");
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(&ComputationStatus::Completed), "completed");
        assert_eq!(
            status_label(&ComputationStatus::Degraded(vec!["a".into(), "b".into()])),
            "degraded (2)"
        );
    }
}
