//! Benchmarks for the folio-risk analytics.
//!
//! Run with: cargo bench -p folio-risk

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::DMatrix;
use rust_decimal::Decimal;

use folio_core::{Holding, PortfolioId, Portfolio, PricePoint, PriceSeries, Symbol};
use folio_risk::{
    analyze_concentration, build_correlation_matrix, monte_carlo_var, run_stress_tests,
    CancelToken, ConcentrationLimits, RiskConfig, ScenarioDefinition, SimulationInputs,
    SimulationParams, TagMap,
};

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn create_symbols(n: usize) -> Vec<Symbol> {
    (0..n).map(|i| Symbol::new(format!("SYM{i:04}"))).collect()
}

fn create_series(symbols: &[Symbol]) -> HashMap<Symbol, PriceSeries> {
    symbols
        .iter()
        .enumerate()
        .map(|(k, s)| {
            let mut price = 50.0 + k as f64;
            let points = (0..260i64)
                .map(|t| {
                    let shock = (((t * 31 + k as i64 * 17) % 41) as f64 - 20.0) / 1_000.0;
                    price *= 1.0 + shock;
                    PricePoint::new(as_of() - Duration::days(259 - t), price)
                })
                .collect();
            (s.clone(), PriceSeries::new(s.clone(), points))
        })
        .collect()
}

fn create_inputs(n: usize) -> SimulationInputs {
    let mut corr = DMatrix::from_element(n, n, 0.25);
    corr.fill_diagonal(1.0);
    let exposures = (0..n).map(|i| 10_000.0 + 500.0 * i as f64).collect();
    let vols = (0..n).map(|i| 0.15 + 0.01 * (i % 10) as f64).collect();
    SimulationInputs::new(exposures, vols, &corr).unwrap()
}

fn create_portfolio(n: usize) -> Portfolio {
    let sectors = ["Technology", "Energy", "Financials", "Utilities", "Materials"];
    let holdings = (0..n)
        .map(|i| {
            Holding::builder(format!("SYM{i:04}"))
                .quantity(Decimal::from(10 + i % 90))
                .current_price(Decimal::from(20 + i % 300))
                .sector(sectors[i % sectors.len()])
                .asset_class("Equity")
                .issuer(format!("Issuer {}", i % 40))
                .build()
                .unwrap()
        })
        .collect();
    Portfolio::new(PortfolioId::new("BENCH"), as_of(), holdings).unwrap()
}

// =============================================================================
// MONTE CARLO VAR
// =============================================================================

fn bench_monte_carlo(c: &mut Criterion) {
    let mut group = c.benchmark_group("monte_carlo_var");
    group.sample_size(20);

    for positions in [2, 10, 50] {
        let inputs = create_inputs(positions);
        let params = SimulationParams::from_config(
            &RiskConfig::default().with_iterations(10_000).with_seed(42),
        );
        group.throughput(Throughput::Elements(10_000));
        group.bench_with_input(
            BenchmarkId::new("positions", positions),
            &positions,
            |b, _| {
                b.iter(|| {
                    monte_carlo_var(
                        black_box(&inputs),
                        black_box(&params),
                        &[0.95, 0.99],
                        &CancelToken::new(),
                    )
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// CORRELATION MATRIX
// =============================================================================

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_matrix");
    group.sample_size(30);
    let config = RiskConfig::default();

    for n in [10, 50, 100] {
        let symbols = create_symbols(n);
        let series = create_series(&symbols);
        group.bench_with_input(BenchmarkId::new("symbols", n), &n, |b, _| {
            b.iter(|| build_correlation_matrix(black_box(&symbols), &series, as_of(), &config))
        });
    }

    group.finish();
}

// =============================================================================
// STRESS AND CONCENTRATION
// =============================================================================

fn bench_portfolio_scans(c: &mut Criterion) {
    let portfolio = create_portfolio(500);
    let tags = TagMap::new();
    let limits = ConcentrationLimits::default();
    let scenarios: Vec<ScenarioDefinition> = (0..10)
        .map(|i| {
            ScenarioDefinition::new(format!("S{i}"), format!("Scenario {i}"))
                .with_sector_shock("Technology", -0.05 * i as f64)
                .with_default_shock(-0.02 * i as f64)
        })
        .collect();
    let selected: Vec<&ScenarioDefinition> = scenarios.iter().collect();

    c.bench_function("concentration_500_holdings", |b| {
        b.iter(|| analyze_concentration(black_box(&portfolio), &tags, &limits))
    });

    c.bench_function("stress_10_scenarios_500_holdings", |b| {
        b.iter(|| run_stress_tests(black_box(&portfolio), &tags, &selected, &CancelToken::new()))
    });
}

criterion_group!(
    benches,
    bench_monte_carlo,
    bench_correlation,
    bench_portfolio_scans
);
criterion_main!(benches);
