pub mod traits;
pub mod forecasting;
pub mod backtesting;
pub mod data;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use forecasting::ForecastingConfig;
pub use backtesting::BacktestingConfig;
pub use data::{DataConfig, ValueKind};
pub use traits::ConfigSection;
