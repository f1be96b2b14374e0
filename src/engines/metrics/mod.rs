pub mod exceedance;

pub use exceedance::ExceedanceMetrics;
