//! Sub-computation status and data-quality warnings.

use std::fmt;

use serde::{Deserialize, Serialize};

use folio_core::{ScenarioId, Symbol};

/// The independently degradable parts of a full risk computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubComputation {
    /// Per-symbol volatility estimation.
    Volatility,
    /// Correlation matrix construction.
    Correlation,
    /// Monte Carlo and parametric VaR.
    ValueAtRisk,
    /// Stress scenarios.
    StressTest,
    /// Concentration and compliance.
    Concentration,
    /// Volatility, Sharpe, Sortino, beta.
    Performance,
}

impl fmt::Display for SubComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Volatility => "volatility",
            Self::Correlation => "correlation",
            Self::ValueAtRisk => "value_at_risk",
            Self::StressTest => "stress_test",
            Self::Concentration => "concentration",
            Self::Performance => "performance",
        };
        f.write_str(name)
    }
}

/// Outcome of one sub-computation.
///
/// `Degraded` means fallback defaults were used and the figures are
/// estimates. `Failed` means the figures are absent. Neither is the same as a
/// completed computation that found zero risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reasons", rename_all = "snake_case")]
pub enum ComputationStatus {
    /// Finished on complete inputs.
    Completed,
    /// Finished using fallback inputs.
    Degraded(Vec<String>),
    /// Did not produce a result.
    Failed(String),
}

impl ComputationStatus {
    /// Completed if `warnings` is empty, degraded otherwise.
    pub fn from_warnings<'a>(warnings: impl IntoIterator<Item = &'a DataWarning>) -> Self {
        let reasons: Vec<String> = warnings.into_iter().map(ToString::to_string).collect();
        if reasons.is_empty() {
            Self::Completed
        } else {
            Self::Degraded(reasons)
        }
    }

    /// True unless failed.
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// True only for `Completed`.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A recoverable data-quality problem, recorded on results instead of
/// failing the computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    /// No price history at all for a symbol.
    MissingPriceHistory {
        /// Affected symbol.
        symbol: Symbol,
    },
    /// Fewer return observations than required.
    ShortPriceHistory {
        /// Affected symbol.
        symbol: Symbol,
        /// Observations available.
        observations: usize,
        /// Observations required.
        required: usize,
    },
    /// Volatility fell back to the configured default.
    DefaultVolatility {
        /// Affected symbol.
        symbol: Symbol,
        /// Volatility used.
        volatility: f64,
    },
    /// A symbol's correlation row and column were set to zero.
    ZeroCorrelation {
        /// Affected symbol.
        symbol: Symbol,
    },
    /// Two symbols had too few common dates for a correlation estimate.
    InsufficientOverlap {
        /// First symbol.
        first: Symbol,
        /// Second symbol.
        second: Symbol,
        /// Common observations.
        observations: usize,
    },
    /// The correlation matrix was not positive semi-definite and was repaired.
    CorrelationRepaired {
        /// Smallest eigenvalue before repair.
        min_eigenvalue: f64,
    },
    /// A requested scenario is not in the library.
    UnknownScenario {
        /// Requested identifier.
        scenario: ScenarioId,
    },
    /// Classification tags could not be resolved for a symbol.
    UnresolvedTags {
        /// Affected symbol.
        symbol: Symbol,
    },
    /// The benchmark series was missing, short or flat.
    BenchmarkUnavailable {
        /// Benchmark symbol.
        symbol: Symbol,
    },
    /// A gateway call failed after retries.
    GatewayUnavailable {
        /// Operation attempted.
        operation: String,
        /// Last error.
        reason: String,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPriceHistory { symbol } => write!(f, "{symbol}: no price history"),
            Self::ShortPriceHistory {
                symbol,
                observations,
                required,
            } => write!(
                f,
                "{symbol}: {observations} return observations, {required} required"
            ),
            Self::DefaultVolatility { symbol, volatility } => {
                write!(f, "{symbol}: default volatility {:.2}% used", volatility * 100.0)
            }
            Self::ZeroCorrelation { symbol } => {
                write!(f, "{symbol}: correlations set to zero")
            }
            Self::InsufficientOverlap {
                first,
                second,
                observations,
            } => write!(
                f,
                "{first}/{second}: {observations} common observations, correlation set to zero"
            ),
            Self::CorrelationRepaired { min_eigenvalue } => write!(
                f,
                "correlation matrix repaired (min eigenvalue {min_eigenvalue:.3e})"
            ),
            Self::UnknownScenario { scenario } => write!(f, "unknown scenario '{scenario}'"),
            Self::UnresolvedTags { symbol } => write!(f, "{symbol}: classification unresolved"),
            Self::BenchmarkUnavailable { symbol } => {
                write!(f, "benchmark {symbol}: insufficient data")
            }
            Self::GatewayUnavailable { operation, reason } => {
                write!(f, "{operation} unavailable: {reason}")
            }
        }
    }
}
