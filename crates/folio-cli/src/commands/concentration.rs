//! Concentration command implementation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use folio_risk::ConcentrationReport;

use crate::cli::{Context, OutputFormat};
use crate::commands::compliance::ViolationRow;
use crate::commands::{engine_for, DataArgs};
use crate::output::{format_pct, print_data_warnings, print_header, print_json, print_output};

/// Arguments for the concentration command.
#[derive(Args, Debug)]
pub struct ConcentrationArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

/// One bucket row.
#[derive(Debug, Serialize, Tabled)]
struct BucketRow {
    #[tabled(rename = "Dimension")]
    dimension: &'static str,
    #[tabled(rename = "Bucket")]
    bucket: String,
    #[tabled(rename = "Share")]
    share: String,
}

fn bucket_rows(report: &ConcentrationReport) -> Vec<BucketRow> {
    let dimensions = [
        ("Sector", &report.by_sector),
        ("Asset Class", &report.by_asset_class),
        ("Issuer", &report.by_issuer),
    ];
    let mut rows: Vec<BucketRow> = dimensions
        .into_iter()
        .flat_map(|(dimension, buckets)| {
            buckets.iter().map(move |(bucket, pct)| BucketRow {
                dimension,
                bucket: bucket.clone(),
                share: format_pct(*pct),
            })
        })
        .collect();
    rows.extend(report.by_position.iter().map(|(symbol, pct)| BucketRow {
        dimension: "Position",
        bucket: symbol.to_string(),
        share: format_pct(*pct),
    }));
    rows
}

/// Execute the concentration command.
pub async fn execute(args: ConcentrationArgs, ctx: &Context) -> Result<()> {
    let engine = engine_for(&args.data, ctx)?;
    let metrics = engine.analyze_concentration(&args.data.portfolio_id()).await?;

    if ctx.format == OutputFormat::Json {
        return print_json(&metrics.concentration);
    }

    if let Some(report) = &metrics.concentration {
        print_header("Concentration");
        print_output(&bucket_rows(report), ctx.format)?;

        if !report.violations.is_empty() {
            let rows: Vec<ViolationRow> = report.violations.iter().map(ViolationRow::from).collect();
            print_header("Limit Breaches");
            print_output(&rows, ctx.format)?;
        }
    }
    print_data_warnings(&metrics.warnings, ctx);
    Ok(())
}
