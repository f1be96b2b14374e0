use super::traits::ConfigSection;
use crate::error::QregvarError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestingConfig {
    /// Lagged hits in the dynamic quantile regression.
    pub dq_lags: usize,
    /// Include the contemporaneous VaR forecast as a DQ regressor.
    pub dq_include_var: bool,
    /// Threshold used to label a test as passed in reports.
    pub significance_level: f64,
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        Self {
            dq_lags: 4,
            dq_include_var: true,
            significance_level: 0.05,
        }
    }
}

impl ConfigSection for BacktestingConfig {
    fn section_name() -> &'static str {
        "backtesting"
    }

    fn validate(&self) -> Result<(), QregvarError> {
        if self.dq_lags == 0 {
            return Err(QregvarError::InvalidConfiguration(
                "dq_lags must be at least 1".to_string(),
            ));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(QregvarError::InvalidConfiguration(
                "Significance level must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}
