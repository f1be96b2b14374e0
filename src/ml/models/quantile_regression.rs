use super::solver::{QuantileSolver, SimplexSolver};
use crate::error::Result;
use crate::types::{FeatureRow, QuantileFit};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Linear conditional-quantile model `y ~ 1 + sigma_h...`, re-fitted per window.
#[derive(Clone)]
pub struct QuantileRegression {
    alpha: f64,
    solver: Arc<dyn QuantileSolver>,
}

impl QuantileRegression {
    pub fn new(alpha: f64) -> Self {
        Self::with_solver(alpha, Arc::new(SimplexSolver::default()))
    }

    pub fn with_solver(alpha: f64, solver: Arc<dyn QuantileSolver>) -> Self {
        Self { alpha, solver }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Fit on exactly the given window of rows.
    pub fn fit(&self, window: &[FeatureRow]) -> Result<QuantileFit> {
        let x = Self::design_matrix(window);
        let y = Self::response(window);
        let beta = self.solver.solve(&x, &y, self.alpha)?;

        Ok(QuantileFit {
            alpha: self.alpha,
            coefficients: beta.iter().copied().collect(),
        })
    }

    /// Fit on `window` and predict the quantile for `next`.
    pub fn forecast(&self, window: &[FeatureRow], next: &FeatureRow) -> Result<f64> {
        Ok(self.fit(window)?.predict(next))
    }

    pub fn design_matrix(rows: &[FeatureRow]) -> DMatrix<f64> {
        let p = rows.first().map_or(1, |r| r.sigmas.len() + 1);
        DMatrix::from_fn(rows.len(), p, |i, j| {
            if j == 0 {
                1.0
            } else {
                rows[i].sigmas[j - 1]
            }
        })
    }

    pub fn response(rows: &[FeatureRow]) -> DVector<f64> {
        DVector::from_iterator(rows.len(), rows.iter().map(|r| r.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QregvarError;
    use chrono::{Duration, NaiveDate};

    fn row(i: usize, y: f64, sigmas: Vec<f64>) -> FeatureRow {
        FeatureRow {
            date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap() + Duration::days(i as i64),
            y,
            sigmas,
        }
    }

    #[test]
    fn test_design_matrix_layout() {
        let rows = vec![row(0, 1.0, vec![0.5, 0.7]), row(1, -1.0, vec![0.6, 0.8])];
        let x = QuantileRegression::design_matrix(&rows);
        assert_eq!(x.shape(), (2, 3));
        assert_eq!(x[(0, 0)], 1.0);
        assert_eq!(x[(1, 1)], 0.6);
        assert_eq!(x[(1, 2)], 0.8);
    }

    #[test]
    fn test_flat_volatility_is_not_identifiable() {
        let rows: Vec<FeatureRow> = (0..50)
            .map(|i| row(i, if i % 2 == 0 { 1.0 } else { -1.0 }, vec![1.0, 1.0, 1.0]))
            .collect();

        let result = QuantileRegression::new(0.05).fit(&rows);
        assert!(matches!(result, Err(QregvarError::NonIdentifiableFit(_))));
    }

    #[test]
    fn test_forecast_uses_next_row_features() {
        // y = -2 * sigma exactly, so every quantile fit recovers the line
        let rows: Vec<FeatureRow> = (0..30)
            .map(|i| {
                let s = 0.5 + i as f64 * 0.1;
                row(i, -2.0 * s, vec![s])
            })
            .collect();
        let next = row(30, 0.0, vec![10.0]);

        let var = QuantileRegression::new(0.05).forecast(&rows, &next).unwrap();
        assert!((var + 20.0).abs() < 1e-8);
    }
}
