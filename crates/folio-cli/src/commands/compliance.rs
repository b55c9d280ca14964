//! Compliance command implementation.
//!
//! Lists concentration limit breaches, worst first.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use folio_risk::{ComplianceViolation, Severity};

use crate::cli::{Context, OutputFormat};
use crate::commands::{engine_for, DataArgs};
use crate::error::CliError;
use crate::output::{format_pct, print_header, print_json, print_output, print_success};

/// Arguments for the compliance command.
#[derive(Args, Debug)]
pub struct ComplianceArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Exit with an error when any limit is breached
    #[arg(long)]
    pub strict: bool,
}

/// One breach row.
#[derive(Debug, Serialize, Tabled)]
pub struct ViolationRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Bucket")]
    bucket: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Severity")]
    severity: &'static str,
}

impl From<&ComplianceViolation> for ViolationRow {
    fn from(v: &ComplianceViolation) -> Self {
        Self {
            kind: v.kind.to_string(),
            bucket: v.bucket.clone(),
            share: format_pct(v.concentration_pct),
            limit: format_pct(v.limit_pct),
            severity: match v.severity {
                Severity::Breach => "breach",
                Severity::Critical => "CRITICAL",
            },
        }
    }
}

/// Execute the compliance command.
pub async fn execute(args: ComplianceArgs, ctx: &Context) -> Result<()> {
    let engine = engine_for(&args.data, ctx)?;
    let violations = engine.check_compliance(&args.data.portfolio_id()).await?;

    if ctx.format == OutputFormat::Json {
        print_json(&violations)?;
    } else if violations.is_empty() {
        print_success(&format!("{} is within all concentration limits", args.data.portfolio));
    } else {
        let rows: Vec<ViolationRow> = violations.iter().map(ViolationRow::from).collect();
        print_header("Limit Breaches");
        print_output(&rows, ctx.format)?;
    }

    if args.strict && !violations.is_empty() {
        return Err(CliError::NonCompliant(violations.len()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_risk::ConcentrationKind;

    #[test]
    fn test_violation_row() {
        let row = ViolationRow::from(&ComplianceViolation {
            kind: ConcentrationKind::Sector,
            bucket: "Technology".to_string(),
            concentration_pct: 47.5,
            limit_pct: 30.0,
            severity: Severity::Critical,
        });
        assert_eq!(row.bucket, "Technology");
        assert_eq!(row.share, "47.50%");
        assert_eq!(row.limit, "30.00%");
        assert_eq!(row.severity, "CRITICAL");
    }
}
