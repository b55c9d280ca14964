//! Monte Carlo VaR.
//!
//! Trials are split into a fixed number of partitions, each driven by its own
//! `StdRng` seeded from the master seed and the partition index. Partitions
//! run on the rayon pool and are concatenated in index order, so a seeded run
//! yields the same sorted P&L vector regardless of thread scheduling.
//!
//! Returns are normal; fat tails and skew are not modeled.

use std::time::Instant;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use rust_decimal::Decimal;

use super::{money, VaREstimate, VaRMethod, VaRResult};
use crate::cancel::CancelToken;
use crate::config::{check_confidence, RiskConfig};
use crate::correlation::cholesky_lower;
use crate::error::{RiskError, RiskResult};

/// Trials between cancellation checks.
const CHECK_INTERVAL: usize = 1024;

/// Pre-resolved inputs for a simulation.
///
/// Everything the trial loop touches is computed here, before any trial runs.
#[derive(Debug, Clone)]
pub struct SimulationInputs {
    exposures: Vec<f64>,
    volatilities: Vec<f64>,
    /// Rows of the lower Cholesky factor, row `i` holding `i + 1` entries.
    lower: Vec<Vec<f64>>,
}

impl SimulationInputs {
    /// Validates inputs and factorizes the correlation matrix.
    ///
    /// `exposures` are market values, `volatilities` annualized, both in the
    /// row order of `correlation`. A single position skips factorization.
    pub fn new(
        exposures: Vec<f64>,
        volatilities: Vec<f64>,
        correlation: &DMatrix<f64>,
    ) -> RiskResult<Self> {
        let n = exposures.len();
        if volatilities.len() != n {
            return Err(RiskError::invalid_input(format!(
                "{} exposures but {} volatilities",
                n,
                volatilities.len()
            )));
        }
        if exposures.iter().chain(&volatilities).any(|v| !v.is_finite()) {
            return Err(RiskError::invalid_input("exposures and volatilities must be finite"));
        }
        if volatilities.iter().any(|v| *v < 0.0) {
            return Err(RiskError::invalid_input("volatility cannot be negative"));
        }

        let lower = if n <= 1 {
            vec![vec![1.0]; n]
        } else {
            if correlation.nrows() != n || correlation.ncols() != n {
                return Err(RiskError::invalid_input(format!(
                    "correlation matrix is {}x{}, expected {n}x{n}",
                    correlation.nrows(),
                    correlation.ncols()
                )));
            }
            let l = cholesky_lower(correlation)?;
            (0..n).map(|i| (0..=i).map(|j| l[(i, j)]).collect()).collect()
        };

        Ok(Self {
            exposures,
            volatilities,
            lower,
        })
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.exposures.len()
    }

    /// True when there is nothing to simulate.
    pub fn is_empty(&self) -> bool {
        self.exposures.is_empty()
    }

    /// Sum of exposures.
    pub fn total_exposure(&self) -> f64 {
        self.exposures.iter().sum()
    }
}

/// Simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Total trials.
    pub iterations: usize,
    /// Horizon in trading days.
    pub horizon_days: u32,
    /// Partition count.
    pub workers: usize,
    /// Master seed; `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Annualization base.
    pub trading_days_per_year: u32,
}

impl SimulationParams {
    /// Parameters from a risk configuration.
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            iterations: config.iterations,
            horizon_days: config.horizon_days,
            workers: config.workers,
            seed: config.seed,
            trading_days_per_year: config.trading_days_per_year,
        }
    }

    /// Overrides the trial count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Overrides the horizon.
    #[must_use]
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    fn validate(&self) -> RiskResult<()> {
        if self.iterations == 0 {
            return Err(RiskError::invalid_input("iteration count must be at least 1"));
        }
        if self.horizon_days == 0 {
            return Err(RiskError::invalid_input("horizon must be at least one day"));
        }
        if self.workers == 0 || self.trading_days_per_year == 0 {
            return Err(RiskError::invalid_input(
                "workers and trading days per year must be positive",
            ));
        }
        Ok(())
    }
}

/// Sorted simulated P&L, shared by every confidence level of one run.
#[derive(Debug, Clone)]
pub struct SimulatedPnl {
    sorted: Vec<f64>,
    seed: u64,
    workers: usize,
    elapsed_ms: u64,
}

impl SimulatedPnl {
    /// P&L values, ascending.
    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// True if no trials ran.
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Master seed used.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rank of the VaR observation: `floor((1 - c) × N)`, zero-indexed.
    fn tail_index(&self, confidence_level: f64) -> usize {
        let n = self.sorted.len();
        let idx = ((1.0 - confidence_level) * n as f64).floor() as usize;
        idx.min(n.saturating_sub(1))
    }

    /// Loss at the `(1 - c)` quantile, floored at zero.
    pub fn var(&self, confidence_level: f64) -> RiskResult<f64> {
        check_confidence(confidence_level)?;
        let Some(p) = self.sorted.get(self.tail_index(confidence_level)) else {
            return Ok(0.0);
        };
        Ok((-p).max(0.0))
    }

    /// Mean loss over the trials at or beyond the VaR rank, floored at zero.
    pub fn expected_shortfall(&self, confidence_level: f64) -> RiskResult<f64> {
        check_confidence(confidence_level)?;
        if self.sorted.is_empty() {
            return Ok(0.0);
        }
        let tail = &self.sorted[..=self.tail_index(confidence_level)];
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        Ok((-mean).max(0.0))
    }

    /// VaR and expected shortfall at `confidence_level`.
    pub fn estimate(&self, confidence_level: f64) -> RiskResult<VaREstimate> {
        Ok(VaREstimate {
            confidence_level,
            var: money(self.var(confidence_level)?),
            expected_shortfall: money(self.expected_shortfall(confidence_level)?),
        })
    }
}

/// SplitMix64 finalizer over (master seed, partition index).
///
/// Adjacent indices map to unrelated seeds.
pub fn derive_seed(master: u64, worker: usize) -> u64 {
    let mut z = master
        .wrapping_add((worker as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Splits `iterations` into `workers` near-equal counts, larger first.
pub fn partition(iterations: usize, workers: usize) -> Vec<usize> {
    if workers == 0 {
        return Vec::new();
    }
    let base = iterations / workers;
    let extra = iterations % workers;
    (0..workers).map(|w| base + usize::from(w < extra)).collect()
}

fn run_partition(
    inputs: &SimulationInputs,
    scaled: &[f64],
    seed: u64,
    trials: usize,
    cancel: &CancelToken,
) -> RiskResult<Vec<f64>> {
    let n = inputs.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut z = vec![0.0_f64; n];
    let mut out = Vec::with_capacity(trials);

    let mut done = 0;
    while done < trials {
        cancel.check()?;
        let end = (done + CHECK_INTERVAL).min(trials);
        for _ in done..end {
            for zi in z.iter_mut() {
                *zi = rng.sample(StandardNormal);
            }
            let mut pnl = 0.0;
            for (i, row) in inputs.lower.iter().enumerate() {
                let correlated: f64 = row.iter().zip(&z).map(|(l, zj)| l * zj).sum();
                pnl += scaled[i] * correlated;
            }
            out.push(pnl);
        }
        done = end;
    }

    Ok(out)
}

/// Runs the simulation and returns the sorted P&L vector.
///
/// Each trial draws one correlated normal return per position, scales it by
/// the position's volatility over the horizon and sums `return × exposure`.
/// All partitions must finish before sorting; any cancellation discards
/// every partial result.
pub fn simulate_pnl(
    inputs: &SimulationInputs,
    params: &SimulationParams,
    cancel: &CancelToken,
) -> RiskResult<SimulatedPnl> {
    params.validate()?;
    let started = Instant::now();
    let seed = params.seed.unwrap_or_else(rand::random);

    let horizon = (f64::from(params.horizon_days) / f64::from(params.trading_days_per_year)).sqrt();
    let scaled: Vec<f64> = inputs
        .exposures
        .iter()
        .zip(&inputs.volatilities)
        .map(|(e, v)| e * v * horizon)
        .collect();

    let counts = partition(params.iterations, params.workers);
    let partials: Vec<Vec<f64>> = counts
        .par_iter()
        .enumerate()
        .map(|(w, trials)| run_partition(inputs, &scaled, derive_seed(seed, w), *trials, cancel))
        .collect::<RiskResult<Vec<_>>>()?;

    cancel.check()?;
    let mut sorted: Vec<f64> = partials.into_iter().flatten().collect();
    sorted.sort_by(f64::total_cmp);

    Ok(SimulatedPnl {
        sorted,
        seed,
        workers: params.workers,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Monte Carlo VaR at each confidence level from one simulation run.
///
/// An empty position set returns zero estimates without simulating.
pub fn monte_carlo_var(
    inputs: &SimulationInputs,
    params: &SimulationParams,
    confidence_levels: &[f64],
    cancel: &CancelToken,
) -> RiskResult<VaRResult> {
    if confidence_levels.is_empty() {
        return Err(RiskError::invalid_input("at least one confidence level is required"));
    }
    for c in confidence_levels {
        check_confidence(*c)?;
    }
    let portfolio_value = money(inputs.total_exposure());

    if inputs.is_empty() {
        return Ok(VaRResult {
            method: VaRMethod::MonteCarlo,
            horizon_days: params.horizon_days,
            portfolio_value: Decimal::ZERO,
            estimates: confidence_levels.iter().map(|c| VaREstimate::zero(*c)).collect(),
            iterations: 0,
            workers: 0,
            seed: params.seed,
            elapsed_ms: 0,
            warnings: Vec::new(),
        });
    }

    let pnl = simulate_pnl(inputs, params, cancel)?;
    let estimates = confidence_levels
        .iter()
        .map(|c| pnl.estimate(*c))
        .collect::<RiskResult<Vec<_>>>()?;

    Ok(VaRResult {
        method: VaRMethod::MonteCarlo,
        horizon_days: params.horizon_days,
        portfolio_value,
        estimates,
        iterations: pnl.len(),
        workers: pnl.workers,
        seed: Some(pnl.seed),
        elapsed_ms: pnl.elapsed_ms,
        warnings: Vec::new(),
    })
}
