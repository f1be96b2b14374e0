use crate::config::ValueKind;
use crate::error::{QregvarError, Result};
use polars::prelude::*;
use super::types::RequiredColumn;
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    /// Resolve the date and value columns, preferring the configured names over aliases.
    ///
    /// Under `ValueKind::Returns` a value column with a price name is rejected.
    pub fn validate_columns(
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
        kind: ValueKind,
    ) -> Result<HashMap<RequiredColumn, String>> {
        let mut column_map = HashMap::new();

        for (required, preferred) in [
            (RequiredColumn::Date, date_column),
            (RequiredColumn::Value, value_column),
        ] {
            match Self::find_column(df, &required, preferred, kind) {
                Some(col_name) => {
                    column_map.insert(required, col_name);
                }
                None => {
                    return Err(QregvarError::DataLoading(format!(
                        "Missing required column: {} (tried '{}' and aliases: {:?})",
                        required.as_str(),
                        preferred,
                        required.aliases(kind)
                    )));
                }
            }
        }

        if let Some(value_name) = column_map.get(&RequiredColumn::Value) {
            if kind == ValueKind::Returns
                && RequiredColumn::Value
                    .aliases(ValueKind::Prices)
                    .iter()
                    .any(|alias| *alias == value_name.as_str())
            {
                return Err(QregvarError::DataLoading(format!(
                    "Column '{}' holds prices; set value_kind = \"Prices\" to load it",
                    value_name
                )));
            }

            let series = df.column(value_name)?;
            if !matches!(
                series.dtype(),
                DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32
            ) {
                return Err(QregvarError::DataLoading(format!(
                    "Column '{}' must be numeric, found {:?}",
                    value_name,
                    series.dtype()
                )));
            }
        }

        Ok(column_map)
    }

    fn find_column(
        df: &DataFrame,
        required: &RequiredColumn,
        preferred: &str,
        kind: ValueKind,
    ) -> Option<String> {
        let columns = df.get_column_names();
        std::iter::once(preferred)
            .chain(required.aliases(kind))
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
            .map(|alias| alias.to_string())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(QregvarError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Null counts for every column that has any
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for col_name in df.get_column_names() {
            let series = df.column(col_name)?;
            let null_count = series.null_count();
            if null_count > 0 {
                null_report.push((col_name.to_string(), null_count));
            }
        }

        Ok(null_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_validate_good_data() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03"],
            "return" => &[0.5, -0.3],
        }
        .unwrap();

        let map = DataValidator::validate_columns(&df, "date", "return", ValueKind::Returns).unwrap();
        assert_eq!(map[&RequiredColumn::Date], "date");
        assert_eq!(map[&RequiredColumn::Value], "return");
    }

    #[test]
    fn test_configured_name_wins_over_alias() {
        let df = df! {
            "Date" => &["2024-01-02", "2024-01-03"],
            "close" => &[100.0, 101.0],
            "spx" => &[4700.0, 4710.0],
        }
        .unwrap();

        let map = DataValidator::validate_columns(&df, "date", "spx", ValueKind::Prices).unwrap();
        assert_eq!(map[&RequiredColumn::Date], "Date");
        assert_eq!(map[&RequiredColumn::Value], "spx");
    }

    #[test]
    fn test_validate_missing_column() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03"],
            "volume" => &[1000.0, 1500.0],
        }
        .unwrap();

        assert!(DataValidator::validate_columns(&df, "date", "return", ValueKind::Returns).is_err());
    }

    #[test]
    fn test_non_numeric_value_column() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03"],
            "return" => &["a", "b"],
        }
        .unwrap();

        assert!(DataValidator::validate_columns(&df, "date", "return", ValueKind::Returns).is_err());
    }

    #[test]
    fn test_minimum_rows_and_nulls() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03", "2024-01-04"],
            "return" => &[Some(0.1), None, Some(0.2)],
        }
        .unwrap();

        assert!(DataValidator::validate_minimum_rows(&df, 3).is_ok());
        assert!(DataValidator::validate_minimum_rows(&df, 4).is_err());
        assert_eq!(
            DataValidator::check_nulls(&df).unwrap(),
            vec![("return".to_string(), 1)]
        );
    }

    #[test]
    fn test_price_alias_needs_price_kind() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03"],
            "Adj Close" => &[4700.0, 4710.0],
        }
        .unwrap();

        assert!(DataValidator::validate_columns(&df, "date", "return", ValueKind::Returns).is_err());
        let map = DataValidator::validate_columns(&df, "date", "return", ValueKind::Prices).unwrap();
        assert_eq!(map[&RequiredColumn::Value], "Adj Close");
    }

    #[test]
    fn test_configured_price_column_rejected_as_returns() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03"],
            "close" => &[4700.0, 4710.0],
        }
        .unwrap();

        let result = DataValidator::validate_columns(&df, "date", "close", ValueKind::Returns);
        assert!(matches!(result, Err(QregvarError::DataLoading(_))));
    }
}
