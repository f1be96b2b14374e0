use crate::config::AppConfig;
use crate::data::ReturnSource;
use crate::engines::forecasting::RollingForecaster;
use crate::engines::validation::{BacktestEvaluator, BacktestResult, CalibrationTestKind};
use crate::error::{QregvarError, Result};
use crate::ml::features::{FeatureConfig, FeatureEngineer};
use crate::types::{ForecastTable, ReturnSeries, VarModel};
use serde::Serialize;
use std::fmt;

/// Everything one run produced, ready for export.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub source: String,
    pub observations: usize,
    pub feature_rows: usize,
    pub config: AppConfig,
    pub forecasts: ForecastTable,
    pub backtests: Vec<BacktestResult>,
}

impl PipelineReport {
    pub fn backtest(&self, model: VarModel) -> Option<&BacktestResult> {
        self.backtests.iter().find(|b| b.model == model)
    }
}

fn verdict(result: &BacktestResult, kind: CalibrationTestKind, level: f64) -> &'static str {
    match result.passed(kind, level) {
        Some(true) => "pass",
        Some(false) => "reject",
        None => "n/a",
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.config.backtesting.significance_level;
        writeln!(
            f,
            "{}: {} returns, {} forecasts at alpha = {} (window {})",
            self.source,
            self.observations,
            self.forecasts.len(),
            self.forecasts.alpha,
            self.forecasts.win_size
        )?;
        for result in &self.backtests {
            writeln!(
                f,
                "  {:<4} exceedances {:>4}/{:<5} CC p = {:.4} ({})  DQ p = {:.4} ({})",
                result.model.alias(),
                result.exceedances,
                result.observations,
                result.cc_pvalue,
                verdict(result, CalibrationTestKind::ConditionalCoverage, level),
                result.dq_pvalue,
                verdict(result, CalibrationTestKind::DynamicQuantile, level),
            )?;
        }
        Ok(())
    }
}

/// Features, rolling forecasts and backtests in one pass.
pub struct VarPipeline {
    config: AppConfig,
}

impl VarPipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn run(&self, source: &dyn ReturnSource) -> Result<PipelineReport> {
        let description = source.describe();
        log::info!("Loading returns from {}", description);
        let series = source.load()?;
        self.run_labeled(&series, description)
    }

    pub fn run_series(&self, series: &ReturnSeries) -> Result<PipelineReport> {
        self.run_labeled(series, format!("memory:{} returns", series.len()))
    }

    fn run_labeled(&self, series: &ReturnSeries, source: String) -> Result<PipelineReport> {
        let forecasting = &self.config.forecasting;

        let required = forecasting.required_history();
        if series.len() < required {
            return Err(QregvarError::InsufficientHistory {
                required,
                available: series.len(),
            });
        }

        let engineer = FeatureEngineer::new(FeatureConfig {
            horizons: forecasting.horizons.clone(),
        });
        let features = engineer.engineer(series)?;
        log::info!(
            "Built {} feature rows from {} returns (horizons {:?})",
            features.len(),
            series.len(),
            features.horizons
        );

        let forecasts = RollingForecaster::new(forecasting.clone()).run(&features)?;
        let backtests = BacktestEvaluator::new(&self.config.backtesting).evaluate(&forecasts)?;

        let report = PipelineReport {
            source,
            observations: series.len(),
            feature_rows: features.len(),
            config: self.config.clone(),
            forecasts,
            backtests,
        };
        log::info!("Pipeline finished\n{}", report);

        Ok(report)
    }
}
