//! # Folio Risk
//!
//! Pure, synchronous risk analytics for equity portfolios.
//!
//! - **Volatility**: annualized historical volatility with default fallback
//! - **Correlation**: pairwise Pearson matrix, PSD repair, Cholesky factor
//! - **VaR**: parallel, seedable Monte Carlo and parametric cross-check
//! - **Stress**: configurable historical shock scenarios
//! - **Concentration**: sector / asset class / issuer / position limits
//! - **Performance**: portfolio volatility, Sharpe, Sortino, beta, alpha
//!
//! Nothing here performs I/O. Inputs are resolved by the caller (see
//! `folio-engine`) and passed in as plain values; degraded inputs come back
//! as [`DataWarning`]s rather than errors.
//!
//! ## Example
//!
//! ```rust
//! use folio_risk::prelude::*;
//! use nalgebra::DMatrix;
//!
//! let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
//! let inputs = SimulationInputs::new(vec![60_000.0, 40_000.0], vec![0.20, 0.15], &corr).unwrap();
//! let params = SimulationParams::from_config(&RiskConfig::default().with_seed(42));
//!
//! let result = monte_carlo_var(&inputs, &params, &[0.95, 0.99], &CancelToken::new()).unwrap();
//! assert!(result.at(0.95).unwrap().var <= result.at(0.99).unwrap().var);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod concentration;
pub mod config;
pub mod correlation;
pub mod error;
pub mod metrics;
pub mod performance;
pub mod returns;
pub mod status;
pub mod stress;
pub mod var;
pub mod volatility;

pub use cancel::CancelToken;
pub use concentration::{
    analyze_concentration, ComplianceViolation, ConcentrationKind, ConcentrationReport, Severity,
    TagMap,
};
pub use config::{ConcentrationLimits, RiskConfig, Validate, ValidationError};
pub use correlation::{build_correlation_matrix, CorrelationMatrix};
pub use error::{RiskError, RiskResult};
pub use metrics::{RiskMetrics, RiskMetricsBuilder, SimulationMetadata};
pub use performance::PerformanceSummary;
pub use status::{ComputationStatus, DataWarning, SubComputation};
pub use stress::{
    run_stress_tests, ScenarioDefinition, ScenarioLibrary, ScenarioResult, StressSummary,
};
pub use var::{
    monte_carlo_var, parametric_var, SimulationInputs, SimulationParams, VaREstimate, VaRMethod,
    VaRResult,
};
pub use volatility::{estimate_volatility, VolatilitySnapshot};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::concentration::{analyze_concentration, ConcentrationReport, TagMap};
    pub use crate::config::{ConcentrationLimits, RiskConfig, Validate};
    pub use crate::correlation::{build_correlation_matrix, CorrelationMatrix};
    pub use crate::error::{RiskError, RiskResult};
    pub use crate::metrics::RiskMetrics;
    pub use crate::status::{ComputationStatus, DataWarning, SubComputation};
    pub use crate::stress::{run_stress_tests, ScenarioDefinition, ScenarioLibrary};
    pub use crate::var::{
        monte_carlo_var, parametric_var, SimulationInputs, SimulationParams, VaRResult,
    };
    pub use crate::volatility::{estimate_volatility, VolatilitySnapshot};
}
