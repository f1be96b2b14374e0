use super::{
    backtesting::BacktestingConfig, data::DataConfig, forecasting::ForecastingConfig,
    traits::ConfigSection,
};
use crate::error::QregvarError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `QREGVAR__FORECASTING__ALPHA=0.01`.
pub const ENV_PREFIX: &str = "QREGVAR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub forecasting: ForecastingConfig,
    pub backtesting: BacktestingConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), QregvarError> {
        validate_section(&self.forecasting)?;
        validate_section(&self.backtesting)?;
        validate_section(&self.data)?;
        Ok(())
    }

    /// Load a TOML file (optional) with environment overrides on top.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, QregvarError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| QregvarError::InvalidConfiguration(format!("Failed to load config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| QregvarError::InvalidConfiguration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

/// Tag validation messages with the TOML section they came from.
fn validate_section<S: ConfigSection>(section: &S) -> Result<(), QregvarError> {
    section.validate().map_err(|e| match e {
        QregvarError::InvalidConfiguration(msg) => {
            QregvarError::InvalidConfiguration(format!("[{}] {}", S::section_name(), msg))
        }
        other => other,
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), QregvarError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QregvarError::InvalidConfiguration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| QregvarError::InvalidConfiguration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write_lock()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), QregvarError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| QregvarError::InvalidConfiguration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| QregvarError::InvalidConfiguration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply `f` to a copy and commit it only if the result validates.
    pub fn update<F>(&self, f: F) -> Result<(), QregvarError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        candidate.validate()?;
        *self.write_lock()? = candidate;
        Ok(())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>, QregvarError> {
        self.config
            .write()
            .map_err(|_| QregvarError::InvalidConfiguration("Config lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_invalid_values() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.forecasting.alpha = 1.5);
        assert!(result.is_err());
        assert_eq!(manager.get().forecasting.alpha, 0.05);

        manager.update(|c| c.forecasting.alpha = 0.01).unwrap();
        assert_eq!(manager.get().forecasting.alpha, 0.01);
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("qregvar_config_{}.toml", std::process::id()));
        let manager = ConfigManager::new();
        manager.update(|c| {
            c.forecasting.win_size = 250;
            c.backtesting.dq_lags = 2;
        }).unwrap();
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        assert_eq!(loaded.get(), manager.get());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[forecasting]\nalpha = 0.01\n").unwrap();
        assert_eq!(config.forecasting.alpha, 0.01);
        assert_eq!(config.forecasting.win_size, 1000);
        assert_eq!(config.backtesting.dq_lags, 4);
    }
}
