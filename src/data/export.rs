use crate::engines::pipeline::PipelineReport;
use crate::error::Result;
use crate::types::ForecastTable;
use polars::df;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const FORECASTS_FILE: &str = "forecasts.csv";
pub const REPORT_FILE: &str = "report.json";

/// Writes forecast tables and pipeline reports for downstream reporting.
pub struct ForecastExporter;

impl ForecastExporter {
    /// One row per forecast date. `var_qreg` and `hit_qreg` are null where the
    /// regression step failed.
    pub fn to_dataframe(table: &ForecastTable) -> Result<DataFrame> {
        let dates: Vec<String> = table.rows.iter().map(|r| r.date.to_string()).collect();
        let realized: Vec<f64> = table.rows.iter().map(|r| r.realized_return).collect();
        let var_hs: Vec<f64> = table.rows.iter().map(|r| r.var_hs).collect();
        let var_qreg: Vec<Option<f64>> = table.rows.iter().map(|r| r.var_qreg).collect();
        let hit_hs: Vec<bool> = table.rows.iter().map(|r| r.realized_return < r.var_hs).collect();
        let hit_qreg: Vec<Option<bool>> = table
            .rows
            .iter()
            .map(|r| r.var_qreg.map(|v| r.realized_return < v))
            .collect();

        let df = df! {
            "date" => dates,
            "realized_return" => realized,
            "var_hs" => var_hs,
            "var_qreg" => var_qreg,
            "hit_hs" => hit_hs,
            "hit_qreg" => hit_qreg,
        }?;

        Ok(df)
    }

    pub fn write_csv<P: AsRef<Path>>(table: &ForecastTable, path: P) -> Result<()> {
        let mut df = Self::to_dataframe(table)?;
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        Ok(())
    }

    pub fn write_report<P: AsRef<Path>>(report: &PipelineReport, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, report)?;
        Ok(())
    }

    /// Write `forecasts.csv` and `report.json` into `dir`, creating it if needed.
    pub fn write_all<P: AsRef<Path>>(report: &PipelineReport, dir: P) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let forecasts_path = dir.join(FORECASTS_FILE);
        let report_path = dir.join(REPORT_FILE);
        Self::write_csv(&report.forecasts, &forecasts_path)?;
        Self::write_report(report, &report_path)?;

        log::info!(
            "Wrote {} and {}",
            forecasts_path.display(),
            report_path.display()
        );
        Ok((forecasts_path, report_path))
    }
}
