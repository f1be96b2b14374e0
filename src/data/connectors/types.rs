use crate::config::ValueKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Columns an input file must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredColumn {
    Date,
    Value,
}

impl RequiredColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Value => "value",
        }
    }

    /// Common alternative column names.
    ///
    /// Value aliases follow what the column holds, so a `Close` column is
    /// never picked up as returns.
    pub fn aliases(&self, kind: ValueKind) -> Vec<&'static str> {
        match (self, kind) {
            (Self::Date, _) => vec!["date", "Date", "DATE", "datetime", "timestamp", "time"],
            (Self::Value, ValueKind::Returns) => vec!["return", "Return", "RETURN", "returns", "ret"],
            (Self::Value, ValueKind::Prices) => vec![
                "close", "Close", "CLOSE", "adj_close", "Adj Close", "price", "Price",
            ],
        }
    }
}

/// Metadata about a loaded CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub num_columns: usize,
    pub columns: Vec<String>,
    pub date_column: String,
    pub value_column: String,
    /// Rows dropped for a null date or value.
    pub dropped_rows: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub value_range: (f64, f64),
}
