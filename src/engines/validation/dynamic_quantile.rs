//! Engle-Manganelli (2004) dynamic quantile test.
//!
//! The demeaned hit `Hit_t = I_t - alpha` is regressed on a constant, the
//! contemporaneous VaR forecast and `lags` lagged hits. Under correct
//! calibration no regressor has explanatory power and
//! `DQ = Hit'X (X'X)^-1 X'Hit / (alpha (1 - alpha))` is chi-square with
//! `ncol(X)` degrees of freedom.

use super::base::{CalibrationTest, CalibrationTestKind, TestResult};
use crate::error::{QregvarError, Result};
use crate::ml::models::design_rank;
use crate::utils::stats::chi_square_sf;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicQuantile {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    /// Rows left after dropping the first `lags` observations.
    pub observations: usize,
}

#[derive(Debug, Clone)]
pub struct DynamicQuantileTest {
    lags: usize,
    include_var: bool,
}

impl Default for DynamicQuantileTest {
    fn default() -> Self {
        Self::new(4, true)
    }
}

impl DynamicQuantileTest {
    pub fn new(lags: usize, include_var: bool) -> Self {
        Self { lags, include_var }
    }

    pub fn regressor_count(&self) -> usize {
        1 + usize::from(self.include_var) + self.lags
    }

    pub fn evaluate(&self, hits: &[bool], var_forecasts: &[f64], alpha: f64) -> Result<DynamicQuantile> {
        if hits.len() != var_forecasts.len() {
            return Err(QregvarError::Computation(format!(
                "{} exceedance indicators but {} forecasts",
                hits.len(),
                var_forecasts.len()
            )));
        }

        let k = self.regressor_count();
        let m = hits.len().saturating_sub(self.lags);
        if m <= k {
            return Err(QregvarError::DegenerateExceedanceSequence(format!(
                "dynamic quantile test has {} usable observations for {} regressors",
                m, k
            )));
        }

        let demeaned: Vec<f64> = hits
            .iter()
            .map(|&h| if h { 1.0 - alpha } else { -alpha })
            .collect();

        let x = DMatrix::from_fn(m, k, |r, c| {
            let t = r + self.lags;
            match (c, self.include_var) {
                (0, _) => 1.0,
                (1, true) => var_forecasts[t],
                (c, true) => demeaned[t + 1 - c],
                (c, false) => demeaned[t - c],
            }
        });
        let y = DVector::from_iterator(m, demeaned[self.lags..].iter().copied());

        let rank = design_rank(&x);
        if rank < k {
            return Err(QregvarError::DegenerateExceedanceSequence(format!(
                "dynamic quantile regressors have rank {} < {}",
                rank, k
            )));
        }

        let xt = x.transpose();
        let xty = &xt * &y;
        let cholesky = (&xt * &x).cholesky().ok_or_else(|| {
            QregvarError::DegenerateExceedanceSequence(
                "dynamic quantile normal equations are not positive definite".to_string(),
            )
        })?;
        let coefficients = cholesky.solve(&xty);
        let statistic = xty.dot(&coefficients) / (alpha * (1.0 - alpha));

        Ok(DynamicQuantile {
            statistic,
            degrees_of_freedom: k,
            p_value: chi_square_sf(statistic, k as f64),
            observations: m,
        })
    }
}

impl CalibrationTest for DynamicQuantileTest {
    fn name(&self) -> &str {
        "Dynamic Quantile (Engle-Manganelli)"
    }

    fn kind(&self) -> CalibrationTestKind {
        CalibrationTestKind::DynamicQuantile
    }

    fn run(&self, hits: &[bool], var_forecasts: &[f64], alpha: f64) -> Result<TestResult> {
        let dq = self.evaluate(hits, var_forecasts, alpha)?;
        Ok(TestResult {
            test_name: self.name().to_string(),
            kind: self.kind(),
            statistic: dq.statistic,
            degrees_of_freedom: dq.degrees_of_freedom as f64,
            p_value: dq.p_value,
            details: json!({
                "observations": dq.observations,
                "lags": self.lags,
                "include_var": self.include_var,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regressor_count() {
        assert_eq!(DynamicQuantileTest::new(4, true).regressor_count(), 6);
        assert_eq!(DynamicQuantileTest::new(2, false).regressor_count(), 3);
    }

    #[test]
    fn test_short_sequence_is_degenerate() {
        let hits = [false, true, false, false, true];
        let var = [-1.0; 5];
        let result = DynamicQuantileTest::default().evaluate(&hits, &var, 0.05);
        assert!(matches!(result, Err(QregvarError::DegenerateExceedanceSequence(_))));
    }

    #[test]
    fn test_constant_hits_are_rank_deficient() {
        let hits = vec![false; 200];
        let var: Vec<f64> = (0..200).map(|i| -1.0 - (i as f64 * 0.1).sin()).collect();
        let result = DynamicQuantileTest::default().evaluate(&hits, &var, 0.05);
        assert!(matches!(result, Err(QregvarError::DegenerateExceedanceSequence(_))));
    }

    #[test]
    fn test_clustered_hits_are_rejected() {
        // Exceedances arrive in runs of five, so lagged hits predict the next one
        let hits: Vec<bool> = (0..1000).map(|i| i % 100 < 5).collect();
        let var: Vec<f64> = (0..1000).map(|i| -1.5 - 0.2 * (i as f64 * 0.37).sin()).collect();
        let dq = DynamicQuantileTest::default().evaluate(&hits, &var, 0.05).unwrap();
        assert_eq!(dq.degrees_of_freedom, 6);
        assert_eq!(dq.observations, 996);
        assert!(dq.p_value < 0.001, "p-value {} should reject", dq.p_value);
    }
}
