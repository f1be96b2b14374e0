// src/engines/metrics/exceedance.rs
use crate::utils::stats::pinball_loss;
use std::collections::HashMap;

pub struct ExceedanceMetrics;

impl ExceedanceMetrics {
    pub fn calculate(realized: &[f64], var_forecasts: &[f64], alpha: f64) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();

        let n = realized.len().min(var_forecasts.len());
        if n == 0 {
            return metrics;
        }

        let pairs = || realized.iter().zip(var_forecasts.iter()).take(n);

        let exceedances: Vec<f64> = pairs()
            .filter(|(r, v)| r < v)
            .map(|(r, v)| v - r)
            .collect();
        let hit_rate = exceedances.len() as f64 / n as f64;

        metrics.insert("observations".to_string(), n as f64);
        metrics.insert("exceedances".to_string(), exceedances.len() as f64);
        metrics.insert("expected_exceedances".to_string(), n as f64 * alpha);
        metrics.insert("hit_rate".to_string(), hit_rate);
        metrics.insert("actual_over_expected".to_string(), hit_rate / alpha);

        // Average check loss of the forecast, the quantity the regression minimizes in-sample
        let quantile_loss = pairs().map(|(r, v)| pinball_loss(r - v, alpha)).sum::<f64>() / n as f64;
        metrics.insert("mean_quantile_loss".to_string(), quantile_loss);

        if !exceedances.is_empty() {
            let magnitude = exceedances.iter().sum::<f64>() / exceedances.len() as f64;
            metrics.insert("mean_exceedance_magnitude".to_string(), magnitude);
        }

        metrics
    }
}
