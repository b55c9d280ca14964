//! Beta command implementation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use folio_core::Symbol;

use crate::cli::{Context, OutputFormat};
use crate::commands::{engine_for, DataArgs};
use crate::output::{format_ratio, print_header, print_json, print_output, KeyValue};

/// Arguments for the beta command.
#[derive(Args, Debug)]
pub struct BetaArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Benchmark symbol
    #[arg(short, long)]
    pub benchmark: String,

    /// Look-back period in calendar days
    #[arg(long, default_value = "365")]
    pub period_days: u32,
}

#[derive(Serialize)]
struct BetaOutput<'a> {
    portfolio_id: &'a str,
    benchmark: &'a Symbol,
    period_days: u32,
    beta: Option<f64>,
}

/// Execute the beta command.
pub async fn execute(args: BetaArgs, ctx: &Context) -> Result<()> {
    let engine = engine_for(&args.data, ctx)?;
    let benchmark = Symbol::new(&args.benchmark);
    let beta = engine
        .calculate_portfolio_beta(&args.data.portfolio_id(), &benchmark, args.period_days)
        .await?;

    if ctx.format == OutputFormat::Json {
        return print_json(&BetaOutput {
            portfolio_id: &args.data.portfolio,
            benchmark: &benchmark,
            period_days: args.period_days,
            beta,
        });
    }

    print_header("Portfolio Beta");
    print_output(
        &[
            KeyValue::new("Portfolio", args.data.portfolio.as_str()),
            KeyValue::new("Benchmark", benchmark.to_string()),
            KeyValue::new("Period (days)", args.period_days.to_string()),
            KeyValue::new("Beta", format_ratio(beta)),
        ],
        ctx.format,
    )
}
