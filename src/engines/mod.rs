pub mod forecasting;
pub mod metrics;
pub mod pipeline;
pub mod validation;

pub use pipeline::{PipelineReport, VarPipeline};
