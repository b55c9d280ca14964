//! The risk engine service.
//!
//! [`RiskEngine`] resolves a portfolio from the holdings store, resolves its
//! market inputs (cached volatility and correlation), then runs the pure
//! analytics from `folio-risk`. Simulation and stress runs execute on the
//! blocking pool so the async executor never runs CPU-bound trials.

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use nalgebra::DMatrix;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use folio_core::{Portfolio, PortfolioId, PriceSeries, ScenarioId, Symbol};
use folio_risk::config::check_confidence;
use folio_risk::performance::{
    beta, jensen_alpha, portfolio_returns, portfolio_volatility, sharpe_ratio, sortino_ratio,
};
use folio_risk::volatility::window_start;
use folio_risk::{
    analyze_concentration, build_correlation_matrix, estimate_volatility, monte_carlo_var,
    parametric_var, run_stress_tests, CancelToken, ComplianceViolation, ComputationStatus,
    ConcentrationReport, CorrelationMatrix, DataWarning, PerformanceSummary, RiskError,
    RiskMetrics, ScenarioDefinition, SimulationInputs, SimulationParams, StressSummary,
    SubComputation, TagMap, VaREstimate, VaRResult, VolatilitySnapshot,
};
use folio_traits::{HoldingsStore, MarketDataGateway, TraitError};

use crate::cache::{CacheStats, TtlCache};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::market::MarketDataResolver;
use crate::runtime::CallPolicy;

/// Correlation cache key: sorted, de-duplicated symbols and valuation date.
pub type CorrelationKey = (Vec<Symbol>, NaiveDate);

/// Volatility and price history cache key.
pub type VolatilityKey = (Symbol, NaiveDate);

/// Lookback closes for one symbol; `None` when the gateway has no history.
type HistoryEntry = Option<Arc<PriceSeries>>;

/// A correlation matrix with the data-quality warnings raised building it.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationEntry {
    /// Matrix over the sorted symbol set.
    pub matrix: CorrelationMatrix,
    /// Warnings raised while building it.
    pub warnings: Vec<DataWarning>,
}

/// A volatility snapshot with the data-quality warnings raised computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityEntry {
    /// Snapshot.
    pub snapshot: VolatilitySnapshot,
    /// Warnings raised while computing it.
    pub warnings: Vec<DataWarning>,
}

/// Hit and miss counters for both caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCacheStats {
    /// Correlation matrix cache.
    pub correlation: CacheStats,
    /// Volatility cache.
    pub volatility: CacheStats,
    /// Lookback price history cache.
    pub history: CacheStats,
}

/// Simulation-ready inputs for one symbol set, aligned by index.
struct MarketInputs {
    exposures: Vec<f64>,
    volatilities: Vec<f64>,
    correlation: DMatrix<f64>,
    volatility_warnings: Vec<DataWarning>,
    correlation_warnings: Vec<DataWarning>,
}

impl MarketInputs {
    fn empty() -> Self {
        Self {
            exposures: Vec::new(),
            volatilities: Vec::new(),
            correlation: DMatrix::zeros(0, 0),
            volatility_warnings: Vec::new(),
            correlation_warnings: Vec::new(),
        }
    }

    fn warnings(&self) -> impl Iterator<Item = &DataWarning> {
        self.volatility_warnings
            .iter()
            .chain(&self.correlation_warnings)
    }
}

/// Portfolio risk engine.
pub struct RiskEngine {
    config: EngineConfig,
    holdings: Arc<dyn HoldingsStore>,
    market: MarketDataResolver,
    policy: CallPolicy,
    correlations: TtlCache<CorrelationKey, Arc<CorrelationEntry>>,
    volatilities: TtlCache<VolatilityKey, Arc<VolatilityEntry>>,
    history: TtlCache<VolatilityKey, HistoryEntry>,
}

impl RiskEngine {
    /// Creates an engine. Prefer [`RiskEngineBuilder`](crate::RiskEngineBuilder),
    /// which validates the configuration.
    pub fn new(
        config: EngineConfig,
        holdings: Arc<dyn HoldingsStore>,
        market: Arc<dyn MarketDataGateway>,
    ) -> Self {
        let policy = config.call_policy();
        let ttl = config.cache_ttl();
        Self {
            market: MarketDataResolver::new(market, policy.clone()),
            holdings,
            policy,
            correlations: TtlCache::new(ttl),
            volatilities: TtlCache::new(ttl),
            history: TtlCache::new(ttl),
            config,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Valuation date: the configured date, or today (UTC).
    pub fn as_of(&self) -> NaiveDate {
        self.config
            .valuation_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    // =========================================================================
    // PUBLIC OPERATIONS
    // =========================================================================

    /// Monte Carlo VaR at one confidence level.
    ///
    /// Fails with a timeout if `cancel` trips or the configured computation
    /// deadline passes; no partial figure is returned.
    #[instrument(skip_all, fields(portfolio_id = %portfolio_id))]
    pub async fn compute_value_at_risk(
        &self,
        portfolio_id: &PortfolioId,
        confidence_level: f64,
        horizon_days: u32,
        iterations: usize,
        cancel: &CancelToken,
    ) -> EngineResult<VaRResult> {
        check_confidence(confidence_level)?;
        if iterations == 0 {
            return Err(RiskError::invalid_input("iteration count must be at least 1").into());
        }
        if horizon_days == 0 {
            return Err(RiskError::invalid_input("horizon must be at least one day").into());
        }

        let started = Instant::now();
        let token = cancel.child_with_timeout(self.config.computation_timeout());
        let (portfolio, _) = self.resolve_portfolio(portfolio_id).await?;
        let inputs = self.market_inputs(&portfolio).await;
        token.check()?;

        let params = SimulationParams::from_config(&self.config.risk)
            .with_iterations(iterations)
            .with_horizon_days(horizon_days);
        let result = self
            .simulate(&inputs, params, vec![confidence_level], &token)
            .await?;

        info!(
            iterations = result.iterations,
            var = %result.var(),
            degraded = result.is_degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed value at risk"
        );
        Ok(result)
    }

    /// Applies the requested scenarios (all scenarios when empty).
    ///
    /// Unknown scenario ids are reported as warnings on the result.
    #[instrument(skip_all, fields(portfolio_id = %portfolio_id))]
    pub async fn run_stress_tests(
        &self,
        portfolio_id: &PortfolioId,
        scenario_ids: &[ScenarioId],
    ) -> EngineResult<RiskMetrics> {
        let (portfolio, mut warnings) = self.resolve_portfolio(portfolio_id).await?;
        let (tags, tag_warnings) = self.market.security_tags(&portfolio).await;

        let (summary, stress_warnings) = self
            .stress(&portfolio, &tags, scenario_ids, &self.computation_token())
            .await?;
        let status = ComputationStatus::from_warnings(stress_warnings.iter().chain(&tag_warnings));
        warnings.extend(stress_warnings);
        warnings.extend(tag_warnings);

        info!(
            scenarios = summary.results.len(),
            max_drawdown = %summary.max_drawdown,
            "Ran stress tests"
        );
        Ok(RiskMetrics::builder(portfolio_id.clone(), portfolio.as_of())
            .total_value(portfolio.total_value())
            .stress(summary)
            .status(SubComputation::StressTest, status)
            .warnings(warnings)
            .build())
    }

    /// Sector, asset class, issuer and position concentration.
    #[instrument(skip_all, fields(portfolio_id = %portfolio_id))]
    pub async fn analyze_concentration(
        &self,
        portfolio_id: &PortfolioId,
    ) -> EngineResult<RiskMetrics> {
        let (portfolio, mut warnings) = self.resolve_portfolio(portfolio_id).await?;
        let (tags, tag_warnings) = self.market.security_tags(&portfolio).await;
        let report = self.concentration(&portfolio, &tags);
        let status = concentration_status(&report, &tag_warnings);
        warnings.extend(tag_warnings);

        Ok(RiskMetrics::builder(portfolio_id.clone(), portfolio.as_of())
            .total_value(portfolio.total_value())
            .concentration(report)
            .status(SubComputation::Concentration, status)
            .warnings(warnings)
            .build())
    }

    /// Limit breaches, by descending concentration.
    ///
    /// A portfolio whose total value is not positive has no meaningful
    /// percentages and fails with [`RiskError::NumericDegenerate`] rather
    /// than reporting an empty, compliant list.
    #[instrument(skip_all, fields(portfolio_id = %portfolio_id))]
    pub async fn check_compliance(
        &self,
        portfolio_id: &PortfolioId,
    ) -> EngineResult<Vec<ComplianceViolation>> {
        let (portfolio, _) = self.resolve_portfolio(portfolio_id).await?;
        let (tags, tag_warnings) = self.market.security_tags(&portfolio).await;
        for w in &tag_warnings {
            warn!(%w, "Compliance checked on degraded classification");
        }
        let report = self.concentration(&portfolio, &tags);
        if report.degenerate {
            return Err(RiskError::degenerate(format!(
                "portfolio {portfolio_id} total value {} is not positive",
                report.total_value
            ))
            .into());
        }
        Ok(report.violations)
    }

    /// Beta of the portfolio's value-weighted returns against `benchmark`
    /// over the last `period_days` calendar days.
    ///
    /// `None` when the benchmark or portfolio history is too short or flat,
    /// or market data is unavailable.
    #[instrument(skip_all, fields(portfolio_id = %portfolio_id, benchmark = %benchmark, period_days = period_days))]
    pub async fn calculate_portfolio_beta(
        &self,
        portfolio_id: &PortfolioId,
        benchmark: &Symbol,
        period_days: u32,
    ) -> EngineResult<Option<f64>> {
        if period_days == 0 {
            return Err(RiskError::invalid_input("period must be at least one day").into());
        }
        let (portfolio, _) = self.resolve_portfolio(portfolio_id).await?;
        if portfolio.is_empty() {
            return Ok(None);
        }

        let as_of = portfolio.as_of();
        let from = window_start(as_of, period_days);
        let mut symbols = portfolio.symbols();
        if !symbols.contains(benchmark) {
            symbols.push(benchmark.clone());
        }

        let series = match self.market.daily_closes(&symbols, from, as_of).await {
            Ok(series) => series,
            Err(warning) => {
                warn!(%warning, "Beta unavailable");
                return Ok(None);
            }
        };
        let returns = portfolio_returns(&portfolio.exposures(), &series, from, as_of);
        let bench = series
            .get(benchmark)
            .map(|s| s.window(from, as_of).dated_returns())
            .unwrap_or_default();

        Ok(beta(&returns, &bench, self.config.risk.min_observations))
    }

    /// Full risk record: VaR at every configured level, parametric VaR,
    /// performance, every configured stress scenario and concentration.
    ///
    /// Degraded or failed parts are recorded in `status`; only portfolio
    /// resolution, cancellation and the computation deadline fail the call.
    #[instrument(skip_all, fields(portfolio_id = %portfolio_id))]
    pub async fn compute_risk_metrics(
        &self,
        portfolio_id: &PortfolioId,
        cancel: &CancelToken,
    ) -> EngineResult<RiskMetrics> {
        let started = Instant::now();
        let token = cancel.child_with_timeout(self.config.computation_timeout());
        let (portfolio, portfolio_warnings) = self.resolve_portfolio(portfolio_id).await?;
        let risk = &self.config.risk;

        // One batched fetch warms the history cache for every later consumer.
        let (history, (tags, tag_warnings)) = tokio::join!(
            self.performance_history(&portfolio),
            self.market.security_tags(&portfolio),
        );
        let inputs = self.market_inputs(&portfolio).await;
        token.check()?;

        let params = SimulationParams::from_config(risk);
        let (var, stress) = tokio::join!(
            self.simulate(&inputs, params, risk.confidence_levels.clone(), &token),
            self.stress(&portfolio, &tags, &[], &token),
        );
        let performance = self.performance(&portfolio, &inputs, history);
        let report = self.concentration(&portfolio, &tags);

        let mut builder = RiskMetrics::builder(portfolio_id.clone(), portfolio.as_of())
            .total_value(portfolio.total_value())
            .warnings(portfolio_warnings)
            .status(
                SubComputation::Volatility,
                ComputationStatus::from_warnings(&inputs.volatility_warnings),
            )
            .status(
                SubComputation::Correlation,
                ComputationStatus::from_warnings(&inputs.correlation_warnings),
            )
            .warnings(inputs.warnings().cloned());

        builder = match var {
            Ok(result) => {
                // Input warnings are already on the builder.
                let status = ComputationStatus::from_warnings(&result.warnings);
                builder
                    .status(SubComputation::ValueAtRisk, status)
                    .monte_carlo(VaRResult {
                        warnings: Vec::new(),
                        ..result
                    })
            }
            Err(e) if e.is_timeout() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Value at risk failed");
                builder.status(SubComputation::ValueAtRisk, ComputationStatus::Failed(e.to_string()))
            }
        };

        match self.parametric(&inputs) {
            Ok(estimates) => builder = builder.parametric(estimates),
            Err(e) => warn!(error = %e, "Parametric VaR unavailable"),
        }

        let (performance, performance_warnings) = performance;
        builder = builder
            .performance(performance)
            .status(
                SubComputation::Performance,
                ComputationStatus::from_warnings(&performance_warnings),
            )
            .warnings(performance_warnings);

        builder = match stress {
            Ok((summary, warnings)) => builder
                .status(
                    SubComputation::StressTest,
                    ComputationStatus::from_warnings(warnings.iter().chain(&tag_warnings)),
                )
                .stress(summary)
                .warnings(warnings),
            Err(e) if e.is_timeout() => return Err(e),
            Err(e) => builder.status(SubComputation::StressTest, ComputationStatus::Failed(e.to_string())),
        };

        builder = builder
            .status(
                SubComputation::Concentration,
                concentration_status(&report, &tag_warnings),
            )
            .concentration(report)
            .warnings(tag_warnings);

        let metrics = builder.build();
        info!(
            computation_id = %metrics.computation_id,
            total_value = %metrics.total_value,
            violations = metrics.violation_count(),
            degraded = metrics.is_degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed risk metrics"
        );
        Ok(metrics)
    }

    /// Correlation matrix for `symbols` at `as_of`, from cache when fresh.
    ///
    /// Price history not already cached is fetched in one batched call on a
    /// miss. A gateway failure yields a zero-correlation matrix that is not
    /// cached.
    pub async fn correlation_matrix(&self, symbols: &[Symbol], as_of: NaiveDate) -> Arc<CorrelationEntry> {
        let key: Vec<Symbol> = symbols.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();

        let result = self
            .correlations
            .get_or_try_insert_with((key.clone(), as_of), || async {
                let series = self.history_for(&key, as_of).await?;
                let (matrix, warnings) =
                    build_correlation_matrix(&key, &series, as_of, &self.config.risk);
                for symbol in &key {
                    let entry = self.volatility_from(symbol, series.get(symbol), as_of);
                    self.volatilities
                        .insert_if_stale((symbol.clone(), as_of), Arc::new(entry));
                }
                Ok::<_, DataWarning>(Arc::new(CorrelationEntry { matrix, warnings }))
            })
            .await;

        match result {
            Ok((entry, hit)) => {
                debug!(symbols = key.len(), %as_of, hit, "Correlation matrix");
                if !entry.warnings.is_empty() && !hit {
                    warn!(warnings = entry.warnings.len(), "Correlation built on degraded inputs");
                }
                entry
            }
            Err(gateway) => {
                let (matrix, mut warnings) =
                    build_correlation_matrix(&key, &Default::default(), as_of, &self.config.risk);
                warnings.insert(0, gateway);
                Arc::new(CorrelationEntry { matrix, warnings })
            }
        }
    }

    /// Volatility of one symbol at `as_of`, from cache when fresh.
    pub async fn volatility(&self, symbol: &Symbol, as_of: NaiveDate) -> Arc<VolatilityEntry> {
        let mut entries = self.volatilities_for(std::slice::from_ref(symbol), as_of).await;
        entries
            .pop()
            .unwrap_or_else(|| Arc::new(self.volatility_from(symbol, None, as_of)))
    }

    /// Drops every cached volatility and correlation entry.
    pub fn invalidate_caches(&self) {
        self.correlations.invalidate_all();
        self.volatilities.invalidate_all();
        self.history.invalidate_all();
        info!("Risk input caches invalidated");
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            correlation: self.correlations.stats(),
            volatility: self.volatilities.stats(),
            history: self.history.stats(),
        }
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// Loads the portfolio snapshot. This is the only fatal step.
    ///
    /// Latest prices from the gateway, where available, replace the stored
    /// current prices before the snapshot is frozen.
    async fn resolve_portfolio(
        &self,
        portfolio_id: &PortfolioId,
    ) -> EngineResult<(Portfolio, Vec<DataWarning>)> {
        let mut holdings = match self
            .policy
            .call("holdings", || self.holdings.holdings(portfolio_id))
            .await
        {
            Ok(Some(holdings)) => holdings,
            Ok(None) | Err(TraitError::NotFound(_)) => {
                return Err(EngineError::PortfolioNotFound(portfolio_id.clone()))
            }
            Err(source) => {
                return Err(EngineError::HoldingsUnavailable {
                    portfolio_id: portfolio_id.clone(),
                    source,
                })
            }
        };

        let symbols: Vec<Symbol> = holdings
            .iter()
            .map(|h| h.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (prices, warnings) = self.market.current_prices(&symbols).await;
        for h in &mut holdings {
            if let Some(price) = prices.get(&h.symbol).filter(|p| !p.is_sign_negative()) {
                h.current_price = *price;
            }
        }

        let portfolio = Portfolio::new(portfolio_id.clone(), self.as_of(), holdings).map_err(
            |source| EngineError::InvalidPortfolio {
                portfolio_id: portfolio_id.clone(),
                source,
            },
        )?;
        debug!(holdings = portfolio.len(), total_value = %portfolio.total_value(), "Resolved portfolio");
        Ok((portfolio, warnings))
    }

    async fn market_inputs(&self, portfolio: &Portfolio) -> MarketInputs {
        if portfolio.is_empty() {
            return MarketInputs::empty();
        }
        let as_of = portfolio.as_of();
        let symbols = portfolio.symbols();
        let exposures = portfolio.exposures();

        let correlation = self.correlation_matrix(&symbols, as_of).await;
        let vols = self.volatilities_for(&symbols, as_of).await;

        MarketInputs {
            exposures: symbols
                .iter()
                .map(|s| exposures.get(s).and_then(ToPrimitive::to_f64).unwrap_or(0.0))
                .collect(),
            volatilities: vols.iter().map(|v| v.snapshot.annualized).collect(),
            correlation: correlation.matrix.submatrix(&symbols),
            volatility_warnings: vols.iter().flat_map(|v| v.warnings.clone()).collect(),
            correlation_warnings: correlation.warnings.clone(),
        }
    }

    /// Volatilities in `symbols` order. Misses are fetched in one batch.
    async fn volatilities_for(&self, symbols: &[Symbol], as_of: NaiveDate) -> Vec<Arc<VolatilityEntry>> {
        let missing: Vec<Symbol> = symbols
            .iter()
            .filter(|s| self.volatilities.get(&((*s).clone(), as_of)).is_none())
            .cloned()
            .collect();

        let fetched = if missing.is_empty() {
            Ok(HashMap::new())
        } else {
            self.history_for(&missing, as_of).await
        };

        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let entry = match &fetched {
                Ok(series) => {
                    let filled = self
                        .volatilities
                        .get_or_try_insert_with((symbol.clone(), as_of), || async {
                            Ok::<_, Infallible>(Arc::new(self.volatility_from(
                                symbol,
                                series.get(symbol),
                                as_of,
                            )))
                        })
                        .await;
                    match filled {
                        Ok((entry, _)) => entry,
                        Err(never) => match never {},
                    }
                }
                Err(gateway) => self.volatilities.get(&(symbol.clone(), as_of)).unwrap_or_else(|| {
                    let mut entry = self.volatility_from(symbol, None, as_of);
                    entry.warnings.insert(0, gateway.clone());
                    Arc::new(entry)
                }),
            };
            out.push(entry);
        }
        out
    }

    /// Lookback closes for `symbols`, from cache when fresh.
    ///
    /// Misses are fetched in one batched call. Symbols the gateway has no
    /// history for are absent from the map. A failed call is not cached.
    async fn history_for(
        &self,
        symbols: &[Symbol],
        as_of: NaiveDate,
    ) -> Result<HashMap<Symbol, PriceSeries>, DataWarning> {
        let mut out = HashMap::with_capacity(symbols.len());
        let mut missing = Vec::new();
        for symbol in symbols {
            match self.history.get(&(symbol.clone(), as_of)) {
                Some(Some(series)) => {
                    out.insert(symbol.clone(), series.as_ref().clone());
                }
                Some(None) => {}
                None => missing.push(symbol.clone()),
            }
        }
        if missing.is_empty() {
            return Ok(out);
        }

        let from = window_start(as_of, self.config.risk.lookback_days);
        let mut fetched = self.market.daily_closes(&missing, from, as_of).await?;
        for symbol in missing {
            let series = fetched.remove(&symbol);
            self.history
                .insert_if_stale((symbol.clone(), as_of), series.clone().map(Arc::new));
            if let Some(series) = series {
                out.insert(symbol, series);
            }
        }
        Ok(out)
    }

    /// History for the portfolio's symbols plus the benchmark.
    async fn performance_history(
        &self,
        portfolio: &Portfolio,
    ) -> Result<HashMap<Symbol, PriceSeries>, DataWarning> {
        if portfolio.is_empty() {
            return Ok(HashMap::new());
        }
        let mut symbols = portfolio.symbols();
        if let Some(b) = &self.config.risk.benchmark_symbol {
            if !symbols.contains(b) {
                symbols.push(b.clone());
            }
        }
        self.history_for(&symbols, portfolio.as_of()).await
    }

    fn volatility_from(
        &self,
        symbol: &Symbol,
        series: Option<&PriceSeries>,
        as_of: NaiveDate,
    ) -> VolatilityEntry {
        let empty;
        let series = match series {
            Some(s) => s,
            None => {
                empty = PriceSeries::empty(symbol.clone());
                &empty
            }
        };
        let (snapshot, warnings) = estimate_volatility(series, as_of, &self.config.risk);
        VolatilityEntry { snapshot, warnings }
    }

    // =========================================================================
    // SUB-COMPUTATIONS
    // =========================================================================

    async fn simulate(
        &self,
        inputs: &MarketInputs,
        params: SimulationParams,
        confidence_levels: Vec<f64>,
        token: &CancelToken,
    ) -> EngineResult<VaRResult> {
        let sim = SimulationInputs::new(
            inputs.exposures.clone(),
            inputs.volatilities.clone(),
            &inputs.correlation,
        )?;
        let token = token.clone();
        let mut result = tokio::task::spawn_blocking(move || {
            monte_carlo_var(&sim, &params, &confidence_levels, &token)
        })
        .await??;
        result.warnings = inputs.warnings().cloned().collect();
        Ok(result)
    }

    fn parametric(&self, inputs: &MarketInputs) -> Result<Vec<VaREstimate>, RiskError> {
        let risk = &self.config.risk;
        if inputs.exposures.is_empty() {
            return Ok(risk
                .confidence_levels
                .iter()
                .map(|c| VaREstimate::zero(*c))
                .collect());
        }
        let scale = risk.horizon_scale(risk.horizon_days);
        risk.confidence_levels
            .iter()
            .map(|c| {
                parametric_var(
                    &inputs.exposures,
                    &inputs.volatilities,
                    &inputs.correlation,
                    *c,
                    scale,
                )
            })
            .collect()
    }

    fn performance(
        &self,
        portfolio: &Portfolio,
        inputs: &MarketInputs,
        history: Result<HashMap<Symbol, PriceSeries>, DataWarning>,
    ) -> (PerformanceSummary, Vec<DataWarning>) {
        let risk = &self.config.risk;
        let mut summary = PerformanceSummary {
            volatility: portfolio_volatility(
                &inputs.exposures,
                &inputs.volatilities,
                &inputs.correlation,
            ),
            ..PerformanceSummary::default()
        };
        if portfolio.is_empty() {
            return (summary, Vec::new());
        }

        let as_of = portfolio.as_of();
        let from = window_start(as_of, risk.lookback_days);
        let series = match history {
            Ok(series) => series,
            Err(warning) => return (summary, vec![warning]),
        };

        let mut warnings = Vec::new();
        let returns = portfolio_returns(&portfolio.exposures(), &series, from, as_of);
        let daily: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();
        summary.observations = daily.len();
        if daily.len() >= risk.min_observations {
            summary.sharpe_ratio =
                sharpe_ratio(&daily, risk.risk_free_rate, risk.trading_days_per_year);
            summary.sortino_ratio =
                sortino_ratio(&daily, risk.risk_free_rate, risk.trading_days_per_year);
        }

        if let Some(benchmark) = &risk.benchmark_symbol {
            let bench = series
                .get(benchmark)
                .map(|s| s.window(from, as_of).dated_returns())
                .unwrap_or_default();
            summary.beta = beta(&returns, &bench, risk.min_observations);
            summary.alpha = summary.beta.and_then(|b| {
                jensen_alpha(
                    &returns,
                    &bench,
                    b,
                    risk.risk_free_rate,
                    risk.trading_days_per_year,
                )
            });
            if summary.beta.is_none() {
                warnings.push(DataWarning::BenchmarkUnavailable {
                    symbol: benchmark.clone(),
                });
            }
        }

        (summary, warnings)
    }

    async fn stress(
        &self,
        portfolio: &Portfolio,
        tags: &TagMap,
        scenario_ids: &[ScenarioId],
        token: &CancelToken,
    ) -> EngineResult<(StressSummary, Vec<DataWarning>)> {
        let (selected, warnings) = self.config.scenarios.select(scenario_ids);
        for w in &warnings {
            warn!(%w, "Scenario skipped");
        }
        if selected.is_empty() {
            return Ok((StressSummary::empty(), warnings));
        }

        let scenarios: Vec<ScenarioDefinition> = selected.into_iter().cloned().collect();
        let portfolio = portfolio.clone();
        let tags = tags.clone();
        let token = token.clone();
        let summary = tokio::task::spawn_blocking(move || {
            let refs: Vec<&ScenarioDefinition> = scenarios.iter().collect();
            run_stress_tests(&portfolio, &tags, &refs, &token)
        })
        .await??;
        Ok((summary, warnings))
    }

    fn concentration(&self, portfolio: &Portfolio, tags: &TagMap) -> ConcentrationReport {
        let report =
            analyze_concentration(portfolio, tags, &self.config.risk.concentration_limits);
        for v in &report.violations {
            warn!(violation = %v, "Concentration limit breached");
        }
        report
    }

    fn computation_token(&self) -> CancelToken {
        CancelToken::with_timeout(self.config.computation_timeout())
    }
}

fn concentration_status(report: &ConcentrationReport, warnings: &[DataWarning]) -> ComputationStatus {
    if report.degenerate {
        ComputationStatus::Failed("portfolio total value is not positive".to_string())
    } else {
        ComputationStatus::from_warnings(warnings)
    }
}
