//! Folio CLI - portfolio risk analytics from the command line.
//!
//! # Usage
//!
//! ```bash
//! # 99% one-day VaR for a portfolio
//! folio var -p GROWTH-1 --holdings holdings.csv --closes closes.csv --confidence 0.99
//!
//! # Selected stress scenarios from a config file
//! folio -c config/folio.toml stress -p GROWTH-1 --holdings holdings.csv --closes closes.csv -s 2008 -s 2020
//!
//! # Limit breaches as JSON
//! folio -f json compliance -p GROWTH-1 --holdings holdings.csv --closes closes.csv
//!
//! # Everything at once
//! folio metrics -p GROWTH-1 --holdings holdings.csv --closes closes.csv --securities securities.csv
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the default filter.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "error" } else { "info,folio=debug" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = cli.context();

    match cli.command {
        Commands::Var(args) => commands::var::execute(args, &ctx).await?,
        Commands::Stress(args) => commands::stress::execute(args, &ctx).await?,
        Commands::Concentration(args) => commands::concentration::execute(args, &ctx).await?,
        Commands::Compliance(args) => commands::compliance::execute(args, &ctx).await?,
        Commands::Beta(args) => commands::beta::execute(args, &ctx).await?,
        Commands::Metrics(args) => commands::metrics::execute(args, &ctx).await?,
        Commands::Config(args) => commands::config::execute(args, &ctx)?,
    }

    Ok(())
}
