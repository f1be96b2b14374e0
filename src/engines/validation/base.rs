use crate::error::{QregvarError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationTestKind {
    ConditionalCoverage,
    DynamicQuantile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub kind: CalibrationTestKind,
    pub statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub details: serde_json::Value,
}

pub trait CalibrationTest: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> CalibrationTestKind;

    /// Run the test on an exceedance sequence and the forecasts that produced it.
    ///
    /// Sequences the test cannot be computed on yield
    /// `DegenerateExceedanceSequence`.
    fn run(&self, hits: &[bool], var_forecasts: &[f64], alpha: f64) -> Result<TestResult>;
}

/// `I_t = 1` when the realized return falls below the VaR forecast.
pub fn exceedance_indicators(realized: &[f64], var_forecasts: &[f64]) -> Result<Vec<bool>> {
    if realized.len() != var_forecasts.len() {
        return Err(QregvarError::Computation(format!(
            "{} realized returns but {} forecasts",
            realized.len(),
            var_forecasts.len()
        )));
    }
    Ok(realized
        .iter()
        .zip(var_forecasts)
        .map(|(r, v)| r < v)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceedance_is_strictly_below() {
        let hits = exceedance_indicators(&[-2.0, -1.0, 0.5], &[-1.0, -1.0, -1.0]).unwrap();
        assert_eq!(hits, vec![true, false, false]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(exceedance_indicators(&[1.0], &[]).is_err());
    }
}
