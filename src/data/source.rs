use super::connectors::CsvConnector;
use crate::config::DataConfig;
use crate::error::{QregvarError, Result};
use crate::types::ReturnSeries;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::path::PathBuf;

/// Anything that can hand the pipeline a daily return series.
pub trait ReturnSource {
    fn load(&self) -> Result<ReturnSeries>;

    /// Short label for logs and reports.
    fn describe(&self) -> String;
}

/// Returns or prices read from a CSV file.
pub struct CsvReturnSource {
    path: PathBuf,
    config: DataConfig,
}

impl CsvReturnSource {
    pub fn new(path: impl Into<PathBuf>, config: DataConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }
}

impl ReturnSource for CsvReturnSource {
    fn load(&self) -> Result<ReturnSeries> {
        let (series, _) = CsvConnector::load_series(&self.path, &self.config)?;
        Ok(series)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// A series already in memory.
pub struct InMemorySource {
    series: ReturnSeries,
}

impl InMemorySource {
    pub fn new(series: ReturnSeries) -> Self {
        Self { series }
    }
}

impl ReturnSource for InMemorySource {
    fn load(&self) -> Result<ReturnSeries> {
        Ok(self.series.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{} returns", self.series.len())
    }
}

/// GARCH(1,1) percent returns on consecutive business days.
///
/// `r_t = sqrt(h_t) z_t`, `h_{t+1} = omega + a r_t^2 + b h_t`, started at the
/// unconditional variance. The same seed always yields the same series.
#[derive(Debug, Clone)]
pub struct SyntheticGarchSource {
    pub observations: usize,
    pub omega: f64,
    pub arch: f64,
    pub garch: f64,
    pub seed: u64,
    pub start: NaiveDate,
}

impl SyntheticGarchSource {
    pub fn new(observations: usize, seed: u64) -> Self {
        Self {
            observations,
            omega: 0.05,
            arch: 0.08,
            garch: 0.9,
            seed,
            start: NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or_default(),
        }
    }

    pub fn with_params(mut self, omega: f64, arch: f64, garch: f64) -> Self {
        self.omega = omega;
        self.arch = arch;
        self.garch = garch;
        self
    }

    fn business_days(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = Vec::with_capacity(self.observations);
        let mut day = self.start;
        while dates.len() < self.observations {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(day);
            }
            day = day
                .succ_opt()
                .ok_or_else(|| QregvarError::Computation("Calendar overflow".to_string()))?;
        }
        Ok(dates)
    }
}

impl ReturnSource for SyntheticGarchSource {
    fn load(&self) -> Result<ReturnSeries> {
        let persistence = self.arch + self.garch;
        if self.omega <= 0.0 || self.arch < 0.0 || self.garch < 0.0 || persistence >= 1.0 {
            return Err(QregvarError::InvalidConfiguration(format!(
                "GARCH parameters (omega {}, a {}, b {}) are not covariance stationary",
                self.omega, self.arch, self.garch
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut variance = self.omega / (1.0 - persistence);

        let observations = self
            .business_days()?
            .into_iter()
            .map(|date| {
                let z: f64 = rng.sample(StandardNormal);
                let r = variance.sqrt() * z;
                variance = self.omega + self.arch * r * r + self.garch * variance;
                (date, r)
            })
            .collect();

        ReturnSeries::new(observations)
    }

    fn describe(&self) -> String {
        format!(
            "garch(omega={}, a={}, b={}, seed={}):{} returns",
            self.omega, self.arch, self.garch, self.seed, self.observations
        )
    }
}
