pub mod engineer;

pub use engineer::{FeatureConfig, FeatureEngineer};
