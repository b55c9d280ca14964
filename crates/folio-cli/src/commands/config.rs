//! Config command implementation.
//!
//! Shows the effective configuration, validates a file and lists scenarios.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use folio_risk::ScenarioDefinition;

use crate::cli::{Context, OutputFormat};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{print_json, print_output, print_success};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Validate a configuration file
    Validate(ValidateArgs),

    /// List configured stress scenarios
    Scenarios,
}

/// Arguments for validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// File to validate. Defaults to --config.
    pub path: Option<PathBuf>,
}

/// One scenario row.
#[derive(Debug, Serialize, Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Shocks")]
    shocks: usize,
    #[tabled(rename = "Default")]
    default_shock: String,
    #[tabled(rename = "Recovery (days)")]
    recovery_days: String,
}

impl From<&ScenarioDefinition> for ScenarioRow {
    fn from(s: &ScenarioDefinition) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            event: s.event.clone().unwrap_or_else(|| "-".to_string()),
            shocks: s.symbol_shocks.len() + s.asset_class_shocks.len() + s.sector_shocks.len(),
            default_shock: s
                .default_shock
                .map_or_else(|| "-".to_string(), |d| format!("{:.1}%", d * 100.0)),
            recovery_days: s
                .recovery_days
                .map_or_else(|| "-".to_string(), |d| d.to_string()),
        }
    }
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = load_config(ctx.config.as_deref())?;
            match ctx.format {
                OutputFormat::Json => print_json(&config)?,
                OutputFormat::Table => print!("{}", toml::to_string_pretty(&config)?),
            }
        }
        ConfigCommand::Validate(v) => {
            let path = v
                .path
                .or_else(|| ctx.config.clone())
                .ok_or_else(|| CliError::Config("no configuration file given".to_string()))?;
            let config = load_config(Some(&path))?;
            print_success(&format!(
                "{} is valid ({} scenarios)",
                path.display(),
                config.scenarios.len()
            ));
        }
        ConfigCommand::Scenarios => {
            let config = load_config(ctx.config.as_deref())?;
            let rows: Vec<ScenarioRow> = config
                .scenarios
                .scenarios()
                .iter()
                .map(ScenarioRow::from)
                .collect();
            print_output(&rows, ctx.format)?;
        }
    }
    Ok(())
}
