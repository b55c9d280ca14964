//! Parametric (variance-covariance) VaR.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use super::{money, VaREstimate};
use crate::config::check_confidence;
use crate::error::{RiskError, RiskResult};

/// Annualized currency volatility `sqrt(wᵀ C w)` with `w_i = exposure_i × σ_i`.
pub fn dollar_volatility(
    exposures: &[f64],
    volatilities: &[f64],
    correlation: &DMatrix<f64>,
) -> RiskResult<f64> {
    let n = exposures.len();
    if volatilities.len() != n {
        return Err(RiskError::invalid_input(
            "exposures and volatilities differ in length",
        ));
    }
    if n == 0 {
        return Ok(0.0);
    }
    if n > 1 && (correlation.nrows() != n || correlation.ncols() != n) {
        return Err(RiskError::invalid_input("correlation matrix dimension mismatch"));
    }

    let w = DVector::from_iterator(n, exposures.iter().zip(volatilities).map(|(e, v)| e * v));
    let variance = if n == 1 {
        w[0] * w[0]
    } else {
        (w.transpose() * correlation * &w)[(0, 0)]
    };

    if !variance.is_finite() {
        return Err(RiskError::degenerate("portfolio variance is not finite"));
    }
    Ok(variance.max(0.0).sqrt())
}

/// Standard normal quantile at `confidence_level`.
pub fn z_score(confidence_level: f64) -> RiskResult<f64> {
    check_confidence(confidence_level)?;
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| RiskError::calculation_failed(e.to_string()))?;
    Ok(normal.inverse_cdf(confidence_level))
}

/// Parametric VaR `z_c × σ_p × sqrt(h / T)` and the matching normal
/// expected shortfall `σ_p × sqrt(h / T) × φ(z_c) / (1 − c)`.
///
/// `horizon_scale` is `sqrt(h / T)`, see
/// [`RiskConfig::horizon_scale`](crate::RiskConfig::horizon_scale).
pub fn parametric_var(
    exposures: &[f64],
    volatilities: &[f64],
    correlation: &DMatrix<f64>,
    confidence_level: f64,
    horizon_scale: f64,
) -> RiskResult<VaREstimate> {
    let z = z_score(confidence_level)?;
    let sigma = dollar_volatility(exposures, volatilities, correlation)? * horizon_scale;

    let normal =
        Normal::new(0.0, 1.0).map_err(|e| RiskError::calculation_failed(e.to_string()))?;
    let es = sigma * normal.pdf(z) / (1.0 - confidence_level);

    Ok(VaREstimate {
        confidence_level,
        var: money(z * sigma),
        expected_shortfall: money(es),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal::prelude::ToPrimitive;

    #[test]
    fn test_z_scores() {
        assert_relative_eq!(z_score(0.95).unwrap(), 1.644_853_6, epsilon = 1e-6);
        assert_relative_eq!(z_score(0.99).unwrap(), 2.326_347_9, epsilon = 1e-6);
        assert!(z_score(1.0).is_err());
    }

    #[test]
    fn test_dollar_volatility_two_assets() {
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let sigma = dollar_volatility(&[60_000.0, 40_000.0], &[0.20, 0.15], &corr).unwrap();
        let expected = (12_000.0_f64.powi(2) + 6_000.0_f64.powi(2) + 2.0 * 0.3 * 72_000_000.0).sqrt();
        assert_relative_eq!(sigma, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_perfect_correlation_adds_linearly() {
        let corr = DMatrix::from_element(2, 2, 1.0);
        let sigma = dollar_volatility(&[100.0, 100.0], &[0.1, 0.3], &corr).unwrap();
        assert_relative_eq!(sigma, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parametric_var_scaling() {
        let corr = DMatrix::identity(1, 1);
        let est = parametric_var(&[1_000_000.0], &[0.16], &corr, 0.99, 1.0).unwrap();
        let var = est.var.to_f64().unwrap();
        assert_relative_eq!(var, 2.326_347_9 * 160_000.0, max_relative = 1e-6);
        assert!(est.expected_shortfall > est.var);
    }

    #[test]
    fn test_empty_is_zero() {
        let est = parametric_var(&[], &[], &DMatrix::zeros(0, 0), 0.95, 1.0).unwrap();
        assert!(est.var.is_zero());
    }
}
