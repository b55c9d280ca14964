//! CLI command implementations.

pub mod beta;
pub mod compliance;
pub mod concentration;
pub mod config;
pub mod metrics;
pub mod stress;
pub mod var;

pub use beta::BetaArgs;
pub use compliance::ComplianceArgs;
pub use concentration::ConcentrationArgs;
pub use config::ConfigArgs;
pub use metrics::MetricsArgs;
pub use stress::StressArgs;
pub use var::VarArgs;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use folio_core::PortfolioId;
use folio_engine::{CancelToken, EngineConfig, RiskEngine, RiskEngineBuilder};
use folio_ext_file::create_file_collaborators;

use crate::cli::Context;
use crate::error::{CliError, CliResult};

/// Input files and portfolio selection shared by the analytics commands.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Portfolio identifier
    #[arg(short, long)]
    pub portfolio: String,

    /// Holdings CSV
    #[arg(long, env = "FOLIO_HOLDINGS")]
    pub holdings: PathBuf,

    /// Daily closes CSV
    #[arg(long, env = "FOLIO_CLOSES")]
    pub closes: PathBuf,

    /// Security master CSV (classification and latest prices)
    #[arg(long, env = "FOLIO_SECURITIES")]
    pub securities: Option<PathBuf>,

    /// Valuation date (YYYY-MM-DD). Defaults to the configured date or today.
    #[arg(long)]
    pub as_of: Option<String>,
}

impl DataArgs {
    /// The selected portfolio.
    pub fn portfolio_id(&self) -> PortfolioId {
        PortfolioId::new(self.portfolio.as_str())
    }
}

/// Parses a date string in YYYY-MM-DD format.
pub fn parse_date(s: &str) -> CliResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CliError::InvalidDate(s.to_string()))
}

/// Validates a confidence level.
pub fn validate_confidence(confidence: f64) -> CliResult<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(CliError::InvalidConfidence(confidence));
    }
    Ok(confidence)
}

/// Loads the configuration file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EngineConfig::from_file(path).map_err(|e| CliError::Config(e.to_string()))
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Builds an engine over the CSV inputs.
pub fn build_engine(data: &DataArgs, mut config: EngineConfig) -> CliResult<RiskEngine> {
    if let Some(date) = &data.as_of {
        config.valuation_date = Some(parse_date(date)?);
    }

    let (holdings, market) =
        create_file_collaborators(&data.holdings, &data.closes, data.securities.as_deref())
            .map_err(|e| CliError::Data(e.to_string()))?;

    RiskEngineBuilder::new()
        .with_config(config)
        .with_holdings_store(holdings)
        .with_market_data(market)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Loads config and builds the engine in one step.
pub fn engine_for(data: &DataArgs, ctx: &Context) -> CliResult<RiskEngine> {
    build_engine(data, load_config(ctx.config.as_deref())?)
}

/// A token tripped by Ctrl-C.
pub fn interrupt_token() -> CancelToken {
    let token = CancelToken::new();
    let trip = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trip.cancel();
        }
    });
    token
}
