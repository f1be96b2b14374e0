use super::traits::ConfigSection;
use crate::error::QregvarError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub input_path: Option<PathBuf>,
    pub date_column: String,
    pub value_column: String,
    pub value_kind: ValueKind,
    /// Where `forecasts.csv` and `report.json` are written, if set.
    pub output_dir: Option<PathBuf>,
    pub min_rows: Option<usize>,
}

/// What the value column of an input file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Daily returns in percent.
    Returns,
    /// Prices, converted to percent log returns on load.
    Prices,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            date_column: "date".to_string(),
            value_column: "return".to_string(),
            value_kind: ValueKind::Returns,
            output_dir: None,
            min_rows: None,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), QregvarError> {
        if self.date_column.trim().is_empty() || self.value_column.trim().is_empty() {
            return Err(QregvarError::InvalidConfiguration(
                "Date and value column names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
