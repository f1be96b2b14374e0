use crate::config::ForecastingConfig;
use crate::error::{QregvarError, Result};
use crate::ml::models::{QuantileRegression, SimplexSolver};
use crate::types::{FeatureRow, FeatureTable, ForecastRow, ForecastTable, StepFailure};
use crate::utils::stats::empirical_quantile;
use rayon::prelude::*;
use std::sync::Arc;

/// Result of one rolling step, before assembly into the table.
struct StepOutcome {
    row: ForecastRow,
    failure: Option<StepFailure>,
}

/// Slides a fixed-size window over the feature table and forecasts the next row
/// with historical simulation and quantile regression.
pub struct RollingForecaster {
    config: ForecastingConfig,
    regression: QuantileRegression,
}

impl RollingForecaster {
    pub fn new(config: ForecastingConfig) -> Self {
        let solver = SimplexSolver::new(config.max_solver_iterations);
        let regression = QuantileRegression::with_solver(config.alpha, Arc::new(solver));
        Self { config, regression }
    }

    /// Emit one forecast per row after the first window, `N - win_size` in total.
    ///
    /// A failed regression fit leaves that row's QREG forecast missing and is
    /// recorded in `failures`; it never aborts the loop.
    pub fn run(&self, features: &FeatureTable) -> Result<ForecastTable> {
        let rows = features.rows();
        let win_size = self.config.win_size;

        if win_size == 0 || win_size >= rows.len() {
            return Err(QregvarError::InvalidConfiguration(format!(
                "win_size {} must be positive and smaller than the {} modeling rows",
                win_size,
                rows.len()
            )));
        }

        log::info!(
            "Rolling {} windows of {} rows (alpha = {}, solver = {}, parallel = {})",
            rows.len() - win_size,
            win_size,
            self.config.alpha,
            self.regression.solver_name(),
            self.config.parallel
        );

        // Each step reads only its own slice; rayon's indexed collect keeps step order
        let outcomes: Vec<StepOutcome> = if self.config.parallel {
            (win_size..rows.len())
                .into_par_iter()
                .map(|target| self.forecast_step(rows, target))
                .collect()
        } else {
            (win_size..rows.len())
                .map(|target| self.forecast_step(rows, target))
                .collect()
        };

        let mut table = ForecastTable {
            alpha: self.config.alpha,
            win_size,
            rows: Vec::with_capacity(outcomes.len()),
            failures: Vec::new(),
        };
        for outcome in outcomes {
            table.rows.push(outcome.row);
            if let Some(failure) = outcome.failure {
                table.failures.push(failure);
            }
        }

        if !table.failures.is_empty() {
            log::warn!(
                "{} of {} quantile regression fits failed; their forecasts are missing",
                table.failures.len(),
                table.rows.len()
            );
        }

        Ok(table)
    }

    /// Forecast row `target` from the `win_size` rows immediately before it.
    fn forecast_step(&self, rows: &[FeatureRow], target: usize) -> StepOutcome {
        let window = &rows[target - self.config.win_size..target];
        let next = &rows[target];
        let step = target - self.config.win_size;

        let returns: Vec<f64> = window.iter().map(|r| r.y).collect();
        let var_hs = empirical_quantile(&returns, self.config.alpha).unwrap_or(f64::NAN);

        let (var_qreg, failure) = match self.regression.forecast(window, next) {
            Ok(var) => (Some(var), None),
            Err(e) => {
                log::debug!("Step {} ({}): quantile regression failed: {}", step, next.date, e);
                (
                    None,
                    Some(StepFailure {
                        step,
                        date: next.date,
                        reason: e.to_string(),
                    }),
                )
            }
        };

        StepOutcome {
            row: ForecastRow {
                date: next.date,
                realized_return: next.y,
                var_hs,
                var_qreg,
            },
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn table(ys: &[f64], sigma: impl Fn(usize) -> f64) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        FeatureTable {
            horizons: vec![1],
            rows: ys
                .iter()
                .enumerate()
                .map(|(i, &y)| FeatureRow {
                    date: start + Duration::days(i as i64),
                    y,
                    sigmas: vec![sigma(i)],
                })
                .collect(),
        }
    }

    #[test]
    fn test_window_must_fit() {
        let features = table(&[0.1, 0.2, 0.3], |i| i as f64);
        let forecaster = RollingForecaster::new(ForecastingConfig {
            win_size: 3,
            horizons: vec![1],
            ..Default::default()
        });
        assert!(matches!(
            forecaster.run(&features),
            Err(QregvarError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_degenerate_window_is_isolated() {
        // Constant sigma in the early windows makes the fit collinear
        let ys: Vec<f64> = (0..12).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let features = table(&ys, |i| if i < 7 { 1.0 } else { i as f64 });
        let forecaster = RollingForecaster::new(ForecastingConfig {
            win_size: 6,
            alpha: 0.25,
            horizons: vec![1],
            parallel: false,
            ..Default::default()
        });

        let result = forecaster.run(&features).unwrap();
        assert_eq!(result.len(), 6);
        // Windows for targets 6 and 7 cover rows 0..6 and 1..7, all with sigma = 1
        assert!(result.rows[0].var_qreg.is_none());
        assert!(result.rows[1].var_qreg.is_none());
        assert!(result.rows[2].var_qreg.is_some());
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].step, 0);
        assert!(result.rows.iter().all(|r| r.var_hs.is_finite()));
    }
}
