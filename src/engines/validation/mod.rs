pub mod base;
pub mod coverage;
pub mod dynamic_quantile;
pub mod evaluator;

pub use base::{exceedance_indicators, CalibrationTest, CalibrationTestKind, TestResult};
pub use coverage::{ConditionalCoverage, ConditionalCoverageTest};
pub use dynamic_quantile::{DynamicQuantile, DynamicQuantileTest};
pub use evaluator::{BacktestEvaluator, BacktestResult};
