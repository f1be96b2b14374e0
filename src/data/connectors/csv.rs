use crate::config::{DataConfig, ValueKind};
use crate::error::{QregvarError, Result};
use crate::types::ReturnSeries;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use super::{
    types::{DatasetMetadata, RequiredColumn},
    validator::DataValidator,
};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Days from 0001-01-01 to 1970-01-01, the epoch of polars `Date`.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| QregvarError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load a CSV file and convert it into a return series.
    pub fn load_series<P: AsRef<Path>>(
        path: P,
        config: &DataConfig,
    ) -> Result<(ReturnSeries, DatasetMetadata)> {
        let df = Self::load(&path)?;
        Self::to_series(&df, config, &path.as_ref().to_string_lossy())
    }

    /// Convert a loaded frame into a return series.
    ///
    /// Rows with a null date or value are dropped with a warning. A price column
    /// is turned into percent log returns, which costs the first row.
    pub fn to_series(
        df: &DataFrame,
        config: &DataConfig,
        source: &str,
    ) -> Result<(ReturnSeries, DatasetMetadata)> {
        let column_map = DataValidator::validate_columns(
            df,
            &config.date_column,
            &config.value_column,
            config.value_kind,
        )?;
        DataValidator::validate_minimum_rows(df, config.min_rows.unwrap_or(2))?;

        let null_report = DataValidator::check_nulls(df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected in {}: {:?}", source, null_report);
        }

        let date_name = &column_map[&RequiredColumn::Date];
        let value_name = &column_map[&RequiredColumn::Value];

        let dates = Self::parse_dates(df.column(date_name)?)?;
        let values = df.column(value_name)?.cast(&DataType::Float64)?;
        let values = values.f64()?;

        let observations: Vec<(NaiveDate, f64)> = dates
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(date, value)| Some((date?, value?)))
            .collect();
        let dropped_rows = df.height() - observations.len();

        let value_range = observations
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| (lo.min(*v), hi.max(*v)));

        let series = match config.value_kind {
            ValueKind::Returns => ReturnSeries::new(observations)?,
            ValueKind::Prices => ReturnSeries::from_prices(observations)?,
        };

        let metadata = DatasetMetadata {
            file_path: source.to_string(),
            num_rows: df.height(),
            num_columns: df.width(),
            columns: df.get_column_names().iter().map(|s| s.to_string()).collect(),
            date_column: date_name.clone(),
            value_column: value_name.clone(),
            dropped_rows,
            date_range: series.date_range(),
            value_range,
        };

        log::info!(
            "Loaded {} returns from {} ({} rows, {} dropped, dates {:?})",
            series.len(),
            metadata.file_path,
            metadata.num_rows,
            metadata.dropped_rows,
            metadata.date_range
        );

        Ok((series, metadata))
    }

    fn parse_dates(column: &Column) -> Result<Vec<Option<NaiveDate>>> {
        match column.dtype() {
            DataType::Date => {
                let days = column.cast(&DataType::Int32)?;
                Ok(days
                    .i32()?
                    .into_iter()
                    .map(|d| d.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)))
                    .collect())
            }
            DataType::String => column
                .str()?
                .into_iter()
                .map(|s| s.map(Self::parse_date).transpose())
                .collect(),
            DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32 => {
                // Compact dates like 20240102 are read as integers
                let ints = column.cast(&DataType::Int64)?;
                ints.i64()?
                    .into_iter()
                    .map(|d| d.map(|d| Self::parse_date(&d.to_string())).transpose())
                    .collect()
            }
            other => Err(QregvarError::DataLoading(format!(
                "Date column '{}' has unsupported type {:?}",
                column.name(),
                other
            ))),
        }
    }

    fn parse_date(raw: &str) -> Result<NaiveDate> {
        let raw = raw.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
            .ok_or_else(|| QregvarError::DataLoading(format!("Unrecognized date '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_returns_with_null_row_dropped() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"],
            "return" => &[Some(0.5), None, Some(-1.0), Some(0.25)],
        }
        .unwrap();

        let (series, metadata) = CsvConnector::to_series(&df, &DataConfig::default(), "test.csv").unwrap();
        assert_eq!(series.returns(), &[0.5, -1.0, 0.25]);
        assert_eq!(metadata.dropped_rows, 1);
        assert_eq!(metadata.value_range, (-1.0, 0.5));
        assert_eq!(
            metadata.date_range,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
            ))
        );
    }

    #[test]
    fn test_prices_become_log_returns() {
        let df = df! {
            "Date" => &["2024/01/02", "2024/01/03", "2024/01/04"],
            "Close" => &[100.0, 110.0, 99.0],
        }
        .unwrap();
        let config = DataConfig {
            value_column: "Close".to_string(),
            value_kind: ValueKind::Prices,
            ..DataConfig::default()
        };

        let (series, _) = CsvConnector::to_series(&df, &config, "prices.csv").unwrap();
        assert_eq!(series.len(), 2);
        assert!((series.returns()[0] - 100.0 * (1.1f64).ln()).abs() < 1e-12);
        assert!((series.returns()[1] - 100.0 * (0.9f64).ln()).abs() < 1e-12);
        assert_eq!(series.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_compact_integer_dates() {
        let df = df! {
            "date" => &[20240102i64, 20240103],
            "return" => &[0.1, 0.2],
        }
        .unwrap();

        let (series, _) = CsvConnector::to_series(&df, &DataConfig::default(), "compact.csv").unwrap();
        assert_eq!(series.dates()[1], NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_unsorted_dates_rejected() {
        let df = df! {
            "date" => &["2024-01-03", "2024-01-02"],
            "return" => &[0.1, 0.2],
        }
        .unwrap();

        let result = CsvConnector::to_series(&df, &DataConfig::default(), "bad.csv");
        assert!(matches!(result, Err(QregvarError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_bad_date_string() {
        let df = df! {
            "date" => &["2024-01-02", "Jan 3"],
            "return" => &[0.1, 0.2],
        }
        .unwrap();

        let result = CsvConnector::to_series(&df, &DataConfig::default(), "bad.csv");
        assert!(matches!(result, Err(QregvarError::DataLoading(_))));
    }

    #[test]
    fn test_close_levels_not_loaded_as_returns() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03", "2024-01-04"],
            "Close" => &[4700.0, 4710.0, 4690.0],
        }
        .unwrap();

        let result = CsvConnector::to_series(&df, &DataConfig::default(), "spx.csv");
        assert!(matches!(result, Err(QregvarError::DataLoading(_))));
    }

    #[test]
    fn test_prices_found_by_alias() {
        let df = df! {
            "date" => &["2024-01-02", "2024-01-03", "2024-01-04"],
            "Close" => &[4700.0, 4710.0, 4690.0],
        }
        .unwrap();
        let config = DataConfig {
            value_kind: ValueKind::Prices,
            ..DataConfig::default()
        };

        let (series, metadata) = CsvConnector::to_series(&df, &config, "spx.csv").unwrap();
        assert_eq!(metadata.value_column, "Close");
        assert_eq!(series.len(), 2);
        assert!((series.returns()[0] - 100.0 * (4710.0f64 / 4700.0).ln()).abs() < 1e-12);
    }
}
