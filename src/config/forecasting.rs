use super::traits::ConfigSection;
use crate::error::QregvarError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastingConfig {
    /// Rows per estimation window.
    pub win_size: usize,
    /// VaR quantile level.
    pub alpha: f64,
    /// Realized-volatility lookbacks in trading days.
    pub horizons: Vec<usize>,
    /// Fit rolling windows on the rayon pool.
    pub parallel: bool,
    pub max_solver_iterations: usize,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            win_size: 1000,
            alpha: 0.05,
            horizons: vec![1, 5, 20],
            parallel: true,
            max_solver_iterations: 10_000,
        }
    }
}

impl ForecastingConfig {
    pub fn max_horizon(&self) -> usize {
        self.horizons.iter().copied().max().unwrap_or(0)
    }

    /// Shortest raw series that yields at least one out-of-sample forecast.
    pub fn required_history(&self) -> usize {
        self.max_horizon() + self.win_size + 1
    }
}

impl ConfigSection for ForecastingConfig {
    fn section_name() -> &'static str {
        "forecasting"
    }

    fn validate(&self) -> Result<(), QregvarError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(QregvarError::InvalidConfiguration(format!(
                "alpha must be strictly between 0 and 1, got {}",
                self.alpha
            )));
        }
        if self.win_size == 0 {
            return Err(QregvarError::InvalidConfiguration(
                "win_size must be positive".to_string(),
            ));
        }
        validate_horizons(&self.horizons)?;
        if self.win_size <= self.horizons.len() + 1 {
            return Err(QregvarError::InvalidConfiguration(format!(
                "win_size {} is too small to fit {} coefficients",
                self.win_size,
                self.horizons.len() + 1
            )));
        }
        if self.max_solver_iterations == 0 {
            return Err(QregvarError::InvalidConfiguration(
                "max_solver_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn validate_horizons(horizons: &[usize]) -> Result<(), QregvarError> {
    if horizons.is_empty() {
        return Err(QregvarError::InvalidConfiguration(
            "At least one volatility horizon is required".to_string(),
        ));
    }
    if horizons.contains(&0) {
        return Err(QregvarError::InvalidConfiguration(
            "Volatility horizons must be positive".to_string(),
        ));
    }
    if horizons.windows(2).any(|w| w[1] <= w[0]) {
        return Err(QregvarError::InvalidConfiguration(format!(
            "Volatility horizons must be strictly increasing, got {:?}",
            horizons
        )));
    }
    Ok(())
}
