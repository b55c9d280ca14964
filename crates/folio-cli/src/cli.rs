//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{
    BetaArgs, ComplianceArgs, ConcentrationArgs, ConfigArgs, MetricsArgs, StressArgs, VarArgs,
};

/// Folio - Portfolio risk analytics CLI
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Suppress logs and data-quality warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "FOLIO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Options shared by every command.
    pub fn context(&self) -> Context {
        Context {
            format: self.format,
            quiet: self.quiet,
            config: self.config.clone(),
        }
    }
}

/// Global options handed to each command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format.
    pub format: OutputFormat,
    /// Suppress warnings.
    pub quiet: bool,
    /// Configuration file.
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Monte Carlo Value-at-Risk at one confidence level
    Var(VarArgs),

    /// Apply historical stress scenarios
    Stress(StressArgs),

    /// Sector, asset class, issuer and position concentration
    Concentration(ConcentrationArgs),

    /// Concentration limit breaches
    Compliance(ComplianceArgs),

    /// Portfolio beta against a benchmark
    Beta(BetaArgs),

    /// Full risk metrics record
    Metrics(MetricsArgs),

    /// Inspect and validate configuration
    Config(ConfigArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_var() {
        let cli = Cli::try_parse_from([
            "folio",
            "-f",
            "json",
            "var",
            "-p",
            "P1",
            "--holdings",
            "h.csv",
            "--closes",
            "c.csv",
            "--confidence",
            "0.99",
            "--horizon",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Var(args) => {
                assert_eq!(args.data.portfolio, "P1");
                assert_eq!(args.confidence, 0.99);
                assert_eq!(args.horizon, 10);
                assert!(args.iterations.is_none());
            }
            _ => panic!("expected var"),
        }
    }

    #[test]
    fn test_parse_repeated_scenarios() {
        let cli = Cli::try_parse_from([
            "folio", "stress", "-p", "P1", "--holdings", "h.csv", "--closes", "c.csv", "-s",
            "2008", "-s", "2020",
        ])
        .unwrap();
        match cli.command {
            Commands::Stress(args) => assert_eq!(args.scenarios, vec!["2008", "2020"]),
            _ => panic!("expected stress"),
        }
    }

    #[test]
    fn test_data_files_are_required() {
        assert!(Cli::try_parse_from(["folio", "var", "-p", "P1"]).is_err());
    }
}
