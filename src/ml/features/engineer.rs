use crate::config::forecasting::validate_horizons;
use crate::error::{QregvarError, Result};
use crate::types::{FeatureRow, FeatureTable, ReturnSeries};

pub struct FeatureConfig {
    pub horizons: Vec<usize>, // e.g., [1, 5, 20]
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            horizons: vec![1, 5, 20],
        }
    }
}

/// Builds lagged realized-volatility features at several horizons.
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn horizons(&self) -> &[usize] {
        &self.config.horizons
    }

    /// Create the modeling table.
    ///
    /// Row `t` carries `sigma_K(t) = sqrt(mean(y(t-K..t-1)^2))` for every
    /// horizon `K`. The first `max(K)` observations lack full history and are
    /// dropped, so the table has exactly `n - max(K)` rows.
    pub fn engineer(&self, series: &ReturnSeries) -> Result<FeatureTable> {
        validate_horizons(&self.config.horizons)?;
        let max_horizon = self.config.horizons.iter().copied().max().unwrap_or(0);

        if series.len() <= max_horizon {
            return Err(QregvarError::InsufficientHistory {
                required: max_horizon + 1,
                available: series.len(),
            });
        }

        let returns = series.returns();
        let rows = series
            .dates()
            .iter()
            .enumerate()
            .skip(max_horizon)
            .map(|(idx, &date)| FeatureRow {
                date,
                y: returns[idx],
                // NO LOOKAHEAD: only returns[idx - K..idx] are read
                sigmas: self
                    .config
                    .horizons
                    .iter()
                    .map(|&k| Self::realized_volatility(&returns[idx - k..idx]))
                    .collect(),
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Built {} feature rows from {} returns (horizons {:?})",
            rows.len(),
            series.len(),
            self.config.horizons
        );

        Ok(FeatureTable {
            horizons: self.config.horizons.clone(),
            rows,
        })
    }

    fn realized_volatility(lagged: &[f64]) -> f64 {
        let mean_square = lagged.iter().map(|y| y * y).sum::<f64>() / lagged.len() as f64;
        mean_square.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(returns: &[f64]) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        ReturnSeries::new(
            returns
                .iter()
                .enumerate()
                .map(|(i, &r)| (start + Duration::days(i as i64), r))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_sigma1_is_absolute_lagged_return() {
        let engineer = FeatureEngineer::new(FeatureConfig { horizons: vec![1, 2] });
        let table = engineer.engineer(&series(&[1.0, -3.0, 4.0, -2.0])).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].y, 4.0);
        assert_eq!(table.rows[0].sigmas[0], 3.0);
        assert!((table.rows[0].sigmas[1] - (5.0f64).sqrt()).abs() < 1e-12);
        assert_eq!(table.rows[1].sigmas[0], 4.0);
        assert!((table.rows[1].sigmas[1] - (12.5f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let engineer = FeatureEngineer::new(FeatureConfig::default());
        let result = engineer.engineer(&series(&[0.5; 20]));
        assert!(matches!(
            result,
            Err(QregvarError::InsufficientHistory { required: 21, available: 20 })
        ));
    }
}
