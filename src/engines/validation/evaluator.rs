use super::base::{exceedance_indicators, CalibrationTest, CalibrationTestKind, TestResult};
use super::coverage::ConditionalCoverageTest;
use super::dynamic_quantile::DynamicQuantileTest;
use crate::config::BacktestingConfig;
use crate::engines::metrics::ExceedanceMetrics;
use crate::error::{QregvarError, Result};
use crate::types::{ForecastSeries, ForecastTable, VarModel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Calibration verdict for one model's forecast series.
///
/// `cc_pvalue` and `dq_pvalue` are NaN when the statistic was undefined for
/// this sequence; the reason is listed in `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub model: VarModel,
    pub observations: usize,
    pub exceedances: usize,
    pub missing_forecasts: usize,
    pub cc_pvalue: f64,
    pub dq_pvalue: f64,
    pub tests: Vec<TestResult>,
    pub metrics: HashMap<String, f64>,
    pub warnings: Vec<String>,
}

impl BacktestResult {
    pub fn p_value(&self, kind: CalibrationTestKind) -> f64 {
        match kind {
            CalibrationTestKind::ConditionalCoverage => self.cc_pvalue,
            CalibrationTestKind::DynamicQuantile => self.dq_pvalue,
        }
    }

    /// `Some(true)` when the test fails to reject calibration at `level`;
    /// `None` when the p-value is undefined.
    pub fn passed(&self, kind: CalibrationTestKind, level: f64) -> Option<bool> {
        let p = self.p_value(kind);
        if p.is_nan() {
            None
        } else {
            Some(p > level)
        }
    }
}

pub struct BacktestEvaluator {
    tests: Vec<Box<dyn CalibrationTest>>,
}

impl BacktestEvaluator {
    pub fn new(config: &BacktestingConfig) -> Self {
        let tests: Vec<Box<dyn CalibrationTest>> = vec![
            Box::new(ConditionalCoverageTest::new()),
            Box::new(DynamicQuantileTest::new(config.dq_lags, config.dq_include_var)),
        ];

        Self { tests }
    }

    /// Backtest every model in the table.
    pub fn evaluate(&self, table: &ForecastTable) -> Result<Vec<BacktestResult>> {
        VarModel::all()
            .into_iter()
            .map(|model| self.evaluate_model(table, model))
            .collect()
    }

    pub fn evaluate_model(&self, table: &ForecastTable, model: VarModel) -> Result<BacktestResult> {
        self.evaluate_series(model, &table.series(model), table.alpha)
    }

    pub fn evaluate_series(
        &self,
        model: VarModel,
        series: &ForecastSeries,
        alpha: f64,
    ) -> Result<BacktestResult> {
        let hits = exceedance_indicators(&series.realized, &series.var)?;

        let mut result = BacktestResult {
            model,
            observations: hits.len(),
            exceedances: hits.iter().filter(|&&h| h).count(),
            missing_forecasts: series.missing,
            cc_pvalue: f64::NAN,
            dq_pvalue: f64::NAN,
            tests: Vec::new(),
            metrics: ExceedanceMetrics::calculate(&series.realized, &series.var, alpha),
            warnings: Vec::new(),
        };

        if series.missing > 0 {
            result.warnings.push(format!(
                "{} rows without a {} forecast were excluded",
                series.missing,
                model.alias()
            ));
        }

        for test in &self.tests {
            match test.run(&hits, &series.var, alpha) {
                Ok(outcome) => {
                    match outcome.kind {
                        CalibrationTestKind::ConditionalCoverage => result.cc_pvalue = outcome.p_value,
                        CalibrationTestKind::DynamicQuantile => result.dq_pvalue = outcome.p_value,
                    }
                    result.tests.push(outcome);
                }
                Err(QregvarError::DegenerateExceedanceSequence(reason)) => {
                    log::warn!("{}: {} undefined: {}", model.alias(), test.name(), reason);
                    result.warnings.push(format!("{}: {}", test.name(), reason));
                }
                Err(e) => return Err(e),
            }
        }

        log::info!(
            "{}: {} exceedances in {} observations, CC p = {:.4}, DQ p = {:.4}",
            model.alias(),
            result.exceedances,
            result.observations,
            result.cc_pvalue,
            result.dq_pvalue
        );

        Ok(result)
    }
}
