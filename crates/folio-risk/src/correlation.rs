//! Correlation matrix construction.
//!
//! Pearson correlations are computed once per unordered pair from returns on
//! the dates both symbols traded. Pairwise estimates over different windows
//! need not form a positive semi-definite matrix, so the result is repaired
//! by eigenvalue clipping before it is factorized for simulation.

use std::collections::HashMap;

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::RiskConfig;
use crate::error::{RiskError, RiskResult};
use crate::returns::{align_pair, DatedReturns};
use crate::status::DataWarning;
use crate::volatility::window_start;
use folio_core::{PriceSeries, Symbol};

/// Eigenvalues below this are treated as negative.
const PSD_TOLERANCE: f64 = 1e-10;

/// Floor applied to clipped eigenvalues.
const EIGEN_FLOOR: f64 = 1e-8;

/// Symmetric correlation matrix with unit diagonal, indexed by sorted symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    symbols: Vec<Symbol>,
    as_of: NaiveDate,
    /// Row-major values.
    values: Vec<f64>,
    /// Symbols whose row and column were zeroed for lack of data.
    degraded: Vec<Symbol>,
}

impl CorrelationMatrix {
    /// Identity matrix over `symbols`.
    pub fn identity(symbols: Vec<Symbol>, as_of: NaiveDate) -> Self {
        let n = symbols.len();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        Self {
            symbols,
            as_of,
            values,
            degraded: Vec::new(),
        }
    }

    /// Builds a matrix from explicit row-major values.
    ///
    /// The values are symmetrized, clamped to [-1, 1] and given a unit
    /// diagonal.
    pub fn from_values(symbols: Vec<Symbol>, as_of: NaiveDate, values: Vec<f64>) -> RiskResult<Self> {
        let n = symbols.len();
        if values.len() != n * n {
            return Err(RiskError::invalid_input(format!(
                "correlation values have length {}, expected {}",
                values.len(),
                n * n
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::invalid_input("correlation values must be finite"));
        }

        let mut out = Self::identity(symbols, as_of);
        for i in 0..n {
            for j in (i + 1)..n {
                let v = (0.5 * (values[i * n + j] + values[j * n + i])).clamp(-1.0, 1.0);
                out.set(i, j, v);
            }
        }
        Ok(out)
    }

    /// Symbols in row order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Date the matrix was estimated for.
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    /// Symbols whose correlations fell back to zero.
    pub fn degraded_symbols(&self) -> &[Symbol] {
        &self.degraded
    }

    /// True if any input was degraded.
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Entry at (i, j).
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size() + j]
    }

    /// Correlation between two symbols, if both are present.
    pub fn between(&self, a: &Symbol, b: &Symbol) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.get(i, j))
    }

    /// Row index of `symbol`.
    pub fn index_of(&self, symbol: &Symbol) -> Option<usize> {
        self.symbols.binary_search(symbol).ok()
    }

    /// Rows as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        let n = self.size();
        self.values.chunks(n.max(1)).take(n).map(<[f64]>::to_vec).collect()
    }

    /// Copy as an nalgebra matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let n = self.size();
        DMatrix::from_row_slice(n, n, &self.values)
    }

    /// Correlations restricted to `subset`, in the order given.
    ///
    /// Symbols missing from this matrix get zero correlation with everything.
    pub fn submatrix(&self, subset: &[Symbol]) -> DMatrix<f64> {
        let idx: Vec<Option<usize>> = subset.iter().map(|s| self.index_of(s)).collect();
        DMatrix::from_fn(subset.len(), subset.len(), |i, j| {
            if i == j {
                return 1.0;
            }
            match (idx[i], idx[j]) {
                (Some(a), Some(b)) => self.get(a, b),
                _ => 0.0,
            }
        })
    }

    fn set(&mut self, i: usize, j: usize, v: f64) {
        let n = self.size();
        self.values[i * n + j] = v;
        self.values[j * n + i] = v;
    }

    fn zero_row(&mut self, i: usize) {
        for j in 0..self.size() {
            if j != i {
                self.set(i, j, 0.0);
            }
        }
    }

    /// Replaces the values with the nearest positive semi-definite
    /// correlation matrix if needed. Returns the smallest eigenvalue found
    /// when a repair was made.
    pub fn repair_psd(&mut self) -> Option<f64> {
        let n = self.size();
        if n < 2 {
            return None;
        }

        let (repaired, min_eigen) = nearest_psd(&self.to_matrix())?;
        for i in 0..n {
            for j in (i + 1)..n {
                self.set(i, j, repaired[(i, j)].clamp(-1.0, 1.0));
            }
        }
        Some(min_eigen)
    }

    /// Lower-triangular Cholesky factor `L` with `L Lᵀ = C`.
    ///
    /// Semi-definite matrices (perfectly correlated symbols) are factorized
    /// after adding a small ridge to the diagonal.
    pub fn cholesky(&self) -> RiskResult<DMatrix<f64>> {
        cholesky_lower(&self.to_matrix())
    }
}

/// Lower Cholesky factor of a symmetric matrix, retrying with a diagonal ridge.
pub fn cholesky_lower(m: &DMatrix<f64>) -> RiskResult<DMatrix<f64>> {
    if m.nrows() != m.ncols() {
        return Err(RiskError::invalid_input("cholesky requires a square matrix"));
    }
    if m.nrows() == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }

    for ridge in [0.0, 1e-12, 1e-10, 1e-8, 1e-6] {
        let mut candidate = m.clone();
        if ridge > 0.0 {
            for i in 0..candidate.nrows() {
                candidate[(i, i)] += ridge;
            }
        }
        if let Some(chol) = candidate.cholesky() {
            return Ok(chol.l());
        }
    }

    Err(RiskError::degenerate("correlation matrix is not positive semi-definite"))
}

/// Clips negative eigenvalues and rescales to a unit diagonal.
///
/// Returns `None` if `m` is already positive semi-definite.
fn nearest_psd(m: &DMatrix<f64>) -> Option<(DMatrix<f64>, f64)> {
    let eig = SymmetricEigen::new(m.clone());
    let min_eigen = eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if min_eigen >= -PSD_TOLERANCE {
        return None;
    }

    let clipped = DVector::from_iterator(
        eig.eigenvalues.len(),
        eig.eigenvalues.iter().map(|v| v.max(EIGEN_FLOOR)),
    );
    let rebuilt = &eig.eigenvectors * DMatrix::from_diagonal(&clipped) * eig.eigenvectors.transpose();

    let n = rebuilt.nrows();
    let scale: Vec<f64> = (0..n).map(|i| rebuilt[(i, i)].max(EIGEN_FLOOR).sqrt()).collect();
    let normalized = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            0.5 * (rebuilt[(i, j)] + rebuilt[(j, i)]) / (scale[i] * scale[j])
        }
    });
    Some((normalized, min_eigen))
}

/// Pearson correlation of two equal-length samples.
///
/// Returns `None` for fewer than two observations or a flat sample.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let sx = xs.iter().std_dev();
    let sy = ys.iter().std_dev();
    if !(sx > 0.0 && sy > 0.0) {
        return None;
    }
    let cov = xs.iter().covariance(ys.iter());
    let r = cov / (sx * sy);
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Builds the correlation matrix for `symbols` from their price history.
///
/// Each series is converted to returns once and reused for every pair.
/// Symbols with fewer than `config.min_observations` returns get zero
/// correlation with every other symbol; pairs whose common dates are too few
/// are zeroed individually. Both cases are reported as warnings.
pub fn build_correlation_matrix(
    symbols: &[Symbol],
    series: &HashMap<Symbol, PriceSeries>,
    as_of: NaiveDate,
    config: &RiskConfig,
) -> (CorrelationMatrix, Vec<DataWarning>) {
    let mut sorted: Vec<Symbol> = symbols.to_vec();
    sorted.sort();
    sorted.dedup();

    let from = window_start(as_of, config.lookback_days);
    let returns: Vec<Option<DatedReturns>> = sorted
        .iter()
        .map(|s| {
            let r = series.get(s)?.window(from, as_of).dated_returns();
            (r.len() >= config.min_observations).then_some(r)
        })
        .collect();

    let mut matrix = CorrelationMatrix::identity(sorted.clone(), as_of);
    let mut warnings = Vec::new();
    let n = sorted.len();

    for (i, r) in returns.iter().enumerate() {
        if r.is_none() && n > 1 {
            matrix.degraded.push(sorted[i].clone());
            warnings.push(DataWarning::ZeroCorrelation {
                symbol: sorted[i].clone(),
            });
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let (Some(a), Some(b)) = (&returns[i], &returns[j]) else {
                continue;
            };
            let (xs, ys) = align_pair(a, b);
            let value = if xs.len() >= config.min_observations {
                pearson(&xs, &ys)
            } else {
                None
            };
            match value {
                Some(v) => matrix.set(i, j, v),
                None => {
                    if xs.len() < config.min_observations {
                        warnings.push(DataWarning::InsufficientOverlap {
                            first: sorted[i].clone(),
                            second: sorted[j].clone(),
                            observations: xs.len(),
                        });
                    }
                }
            }
        }
    }

    for i in 0..n {
        if returns[i].is_none() {
            matrix.zero_row(i);
        }
    }

    if let Some(min_eigenvalue) = matrix.repair_psd() {
        warnings.push(DataWarning::CorrelationRepaired { min_eigenvalue });
    }

    (matrix, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use folio_core::PricePoint;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn series_from_returns(symbol: &str, returns: &[f64]) -> PriceSeries {
        let n = returns.len() as i64;
        let mut price = 100.0;
        let mut points = vec![PricePoint::new(as_of() - Duration::days(n), price)];
        for (i, r) in returns.iter().enumerate() {
            price *= 1.0 + r;
            points.push(PricePoint::new(as_of() - Duration::days(n - 1 - i as i64), price));
        }
        PriceSeries::new(symbol, points)
    }

    fn wave(n: usize, phase: f64) -> Vec<f64> {
        (0..n).map(|i| 0.01 * ((i as f64) * 0.7 + phase).sin()).collect()
    }

    #[test]
    fn test_pearson_perfect() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(pearson(&xs, &ys).unwrap(), 1.0, epsilon = 1e-12);

        let neg = [-1.0, -2.0, -3.0, -4.0];
        assert_relative_eq!(pearson(&xs, &neg).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_flat_is_none() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(pearson(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let mut map = HashMap::new();
        for (sym, phase) in [("AAA", 0.0), ("BBB", 0.4), ("CCC", 2.0)] {
            map.insert(Symbol::new(sym), series_from_returns(sym, &wave(60, phase)));
        }
        let symbols: Vec<Symbol> = ["CCC", "AAA", "BBB"].iter().map(|s| Symbol::new(*s)).collect();

        let (m, warnings) = build_correlation_matrix(&symbols, &map, as_of(), &RiskConfig::default());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(m.symbols()[0].as_str(), "AAA");

        for i in 0..3 {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
                assert!((-1.0..=1.0).contains(&m.get(i, j)));
            }
        }
        assert!(m.between(&Symbol::new("AAA"), &Symbol::new("BBB")).unwrap() > 0.8);
    }

    #[test]
    fn test_short_series_zeroes_row() {
        let mut map = HashMap::new();
        map.insert(Symbol::new("AAA"), series_from_returns("AAA", &wave(60, 0.0)));
        map.insert(Symbol::new("BBB"), series_from_returns("BBB", &wave(60, 0.1)));
        map.insert(Symbol::new("NEW"), series_from_returns("NEW", &wave(5, 0.0)));
        let symbols: Vec<Symbol> = map.keys().cloned().collect();

        let (m, warnings) = build_correlation_matrix(&symbols, &map, as_of(), &RiskConfig::default());
        let new = m.index_of(&Symbol::new("NEW")).unwrap();
        for j in 0..m.size() {
            let expected = if j == new { 1.0 } else { 0.0 };
            assert_eq!(m.get(new, j), expected);
            assert_eq!(m.get(j, new), expected);
        }
        assert!(m.is_degraded());
        assert_eq!(m.degraded_symbols(), &[Symbol::new("NEW")]);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, DataWarning::ZeroCorrelation { symbol } if symbol.as_str() == "NEW")));
    }

    #[test]
    fn test_single_symbol_is_identity() {
        let map = HashMap::new();
        let (m, warnings) =
            build_correlation_matrix(&[Symbol::new("ONE")], &map, as_of(), &RiskConfig::default());
        assert_eq!(m.size(), 1);
        assert_eq!(m.get(0, 0), 1.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_repair_non_psd() {
        // Pairwise-consistent but jointly impossible.
        let symbols = vec![Symbol::new("A"), Symbol::new("B"), Symbol::new("C")];
        let values = vec![
            1.0, 0.9, -0.9, //
            0.9, 1.0, 0.9, //
            -0.9, 0.9, 1.0,
        ];
        let mut m = CorrelationMatrix::from_values(symbols, as_of(), values).unwrap();
        assert!(m.cholesky().is_err());

        let min_eigen = m.repair_psd().unwrap();
        assert!(min_eigen < 0.0);

        let eig = SymmetricEigen::new(m.to_matrix());
        assert!(eig.eigenvalues.iter().all(|v| *v > -1e-9));
        for i in 0..3 {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert!(m.cholesky().is_ok());
        assert!(m.repair_psd().is_none());
    }

    #[test]
    fn test_cholesky_reconstructs() {
        let symbols = vec![Symbol::new("A"), Symbol::new("B")];
        let m = CorrelationMatrix::from_values(symbols, as_of(), vec![1.0, 0.3, 0.3, 1.0]).unwrap();
        let l = m.cholesky().unwrap();
        let rebuilt = &l * l.transpose();
        assert_relative_eq!(rebuilt[(0, 1)], 0.3, epsilon = 1e-12);
        assert_relative_eq!(rebuilt[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_correlation_factorizes_with_ridge() {
        let symbols = vec![Symbol::new("A"), Symbol::new("B")];
        let m = CorrelationMatrix::from_values(symbols, as_of(), vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!(m.cholesky().is_ok());
    }

    #[test]
    fn test_submatrix_order_and_missing() {
        let symbols = vec![Symbol::new("A"), Symbol::new("B")];
        let m = CorrelationMatrix::from_values(symbols, as_of(), vec![1.0, 0.5, 0.5, 1.0]).unwrap();
        let sub = m.submatrix(&[Symbol::new("B"), Symbol::new("Z"), Symbol::new("A")]);
        assert_eq!(sub[(0, 2)], 0.5);
        assert_eq!(sub[(1, 0)], 0.0);
        assert_eq!(sub[(1, 1)], 1.0);
    }
}
