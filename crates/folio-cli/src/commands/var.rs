//! VaR command implementation.
//!
//! Runs one Monte Carlo simulation at a single confidence level.

use anyhow::Result;
use clap::Args;

use crate::cli::{Context, OutputFormat};
use crate::commands::{build_engine, interrupt_token, load_config, validate_confidence, DataArgs};
use crate::output::{print_data_warnings, print_header, print_json, print_output, KeyValue};

/// Arguments for the var command.
#[derive(Args, Debug)]
pub struct VarArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Confidence level, e.g. 0.95
    #[arg(long, default_value = "0.95")]
    pub confidence: f64,

    /// Horizon in trading days
    #[arg(long, default_value = "1")]
    pub horizon: u32,

    /// Number of trials. Defaults to the configured count.
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Random seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Execute the var command.
pub async fn execute(args: VarArgs, ctx: &Context) -> Result<()> {
    let confidence = validate_confidence(args.confidence)?;

    let mut config = load_config(ctx.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.risk.seed = Some(seed);
    }
    let iterations = args.iterations.unwrap_or(config.risk.iterations);
    let engine = build_engine(&args.data, config)?;

    let result = engine
        .compute_value_at_risk(
            &args.data.portfolio_id(),
            confidence,
            args.horizon,
            iterations,
            &interrupt_token(),
        )
        .await?;

    if ctx.format == OutputFormat::Json {
        return print_json(&result);
    }

    let mut rows = vec![
        KeyValue::new("Portfolio", args.data.portfolio.as_str()),
        KeyValue::money("Portfolio Value", result.portfolio_value),
        KeyValue::new("Confidence", format!("{:.2}%", confidence * 100.0)),
        KeyValue::new("Horizon (days)", result.horizon_days.to_string()),
    ];
    if let Some(estimate) = result.estimates.first() {
        rows.push(KeyValue::money("Value at Risk", estimate.var));
        rows.push(KeyValue::money("Expected Shortfall", estimate.expected_shortfall));
    }
    rows.push(KeyValue::new("Iterations", result.iterations.to_string()));
    if let Some(seed) = result.seed {
        rows.push(KeyValue::new("Seed", seed.to_string()));
    }
    rows.push(KeyValue::new("Elapsed (ms)", result.elapsed_ms.to_string()));

    print_header("Monte Carlo Value at Risk");
    print_output(&rows, ctx.format)?;
    print_data_warnings(&result.warnings, ctx);
    Ok(())
}
