use crate::error::{QregvarError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Forecasting model a VaR series comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarModel {
    HistoricalSimulation,
    QuantileRegression,
}

impl VarModel {
    pub fn alias(&self) -> &'static str {
        match self {
            Self::HistoricalSimulation => "HS",
            Self::QuantileRegression => "QREG",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::HistoricalSimulation, Self::QuantileRegression]
    }
}

/// Daily return series, strictly increasing in date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    returns: Vec<f64>,
}

impl ReturnSeries {
    /// Build a series from (date, return-in-percent) pairs.
    ///
    /// Dates must be strictly increasing and returns finite.
    pub fn new(observations: Vec<(NaiveDate, f64)>) -> Result<Self> {
        let mut dates = Vec::with_capacity(observations.len());
        let mut returns = Vec::with_capacity(observations.len());

        for (i, (date, value)) in observations.into_iter().enumerate() {
            if let Some(prev) = dates.last() {
                if date <= *prev {
                    return Err(QregvarError::InvalidConfiguration(format!(
                        "Dates must be strictly increasing: {} at position {} follows {}",
                        date, i, prev
                    )));
                }
            }
            if !value.is_finite() {
                return Err(QregvarError::DataLoading(format!(
                    "Non-finite return {} on {}",
                    value, date
                )));
            }
            dates.push(date);
            returns.push(value);
        }

        Ok(Self { dates, returns })
    }

    /// Percent log returns `100 * ln(P_t / P_{t-1})`, dated at `t`.
    pub fn from_prices(prices: Vec<(NaiveDate, f64)>) -> Result<Self> {
        if prices.len() < 2 {
            return Err(QregvarError::InsufficientHistory {
                required: 2,
                available: prices.len(),
            });
        }
        if let Some((date, price)) = prices.iter().find(|(_, p)| !(p.is_finite() && *p > 0.0)) {
            return Err(QregvarError::DataLoading(format!(
                "Price on {} must be finite and positive, got {}",
                date, price
            )));
        }

        let observations = prices
            .windows(2)
            .map(|w| (w[1].0, 100.0 * (w[1].1 / w[0].1).ln()))
            .collect();

        Self::new(observations)
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }
}

/// One modeling row: the day's return and its lagged volatility features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub y: f64,
    /// One realized-volatility estimate per horizon, in horizon order.
    pub sigmas: Vec<f64>,
}

impl FeatureRow {
    /// Regressor vector `[1, sigma_h...]`.
    pub fn regressors(&self) -> Vec<f64> {
        std::iter::once(1.0).chain(self.sigmas.iter().copied()).collect()
    }
}

/// Complete feature rows in date order, plus the horizons that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub horizons: Vec<usize>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }
}

/// Coefficients of a linear quantile model fitted on a single window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileFit {
    pub alpha: f64,
    /// Intercept first, then one slope per horizon.
    pub coefficients: Vec<f64>,
}

impl QuantileFit {
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        self.coefficients
            .iter()
            .zip(row.regressors())
            .map(|(b, x)| b * x)
            .sum()
    }
}

/// One out-of-sample step of the rolling forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub realized_return: f64,
    pub var_hs: f64,
    /// Missing when the quantile regression could not be fitted for this step.
    pub var_qreg: Option<f64>,
}

impl ForecastRow {
    pub fn var(&self, model: VarModel) -> Option<f64> {
        match model {
            VarModel::HistoricalSimulation => Some(self.var_hs),
            VarModel::QuantileRegression => self.var_qreg,
        }
    }
}

/// Marker for a rolling step whose regression fit failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: usize,
    pub date: NaiveDate,
    pub reason: String,
}

/// Realized returns and forecasts for a single model, aligned and in date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    pub dates: Vec<NaiveDate>,
    pub realized: Vec<f64>,
    pub var: Vec<f64>,
    /// Rows dropped because the model had no forecast for them.
    pub missing: usize,
}

/// Output of the rolling forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    pub alpha: f64,
    pub win_size: usize,
    pub rows: Vec<ForecastRow>,
    pub failures: Vec<StepFailure>,
}

impl ForecastTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract one model's forecasts, skipping rows where it has none.
    pub fn series(&self, model: VarModel) -> ForecastSeries {
        let mut series = ForecastSeries::default();
        for row in &self.rows {
            match row.var(model) {
                Some(var) => {
                    series.dates.push(row.date);
                    series.realized.push(row.realized_return);
                    series.var.push(var);
                }
                None => series.missing += 1,
            }
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        let result = ReturnSeries::new(vec![(date(2), 0.1), (date(2), 0.2)]);
        assert!(matches!(result, Err(QregvarError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_decreasing_dates() {
        let result = ReturnSeries::new(vec![(date(3), 0.1), (date(2), 0.2)]);
        assert!(matches!(result, Err(QregvarError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_nan_returns() {
        let result = ReturnSeries::new(vec![(date(1), f64::NAN)]);
        assert!(matches!(result, Err(QregvarError::DataLoading(_))));
    }

    #[test]
    fn test_from_prices_log_returns() {
        let series = ReturnSeries::from_prices(vec![
            (date(1), 100.0),
            (date(2), 110.0),
            (date(3), 99.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.dates(), &[date(2), date(3)]);
        assert!((series.returns()[0] - 100.0 * (1.1f64).ln()).abs() < 1e-12);
        assert!((series.returns()[1] - 100.0 * (0.9f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_forecast_series_skips_missing() {
        let table = ForecastTable {
            alpha: 0.05,
            win_size: 10,
            rows: vec![
                ForecastRow { date: date(1), realized_return: -1.0, var_hs: -2.0, var_qreg: Some(-1.5) },
                ForecastRow { date: date(2), realized_return: 0.5, var_hs: -2.0, var_qreg: None },
                ForecastRow { date: date(3), realized_return: -3.0, var_hs: -2.1, var_qreg: Some(-1.4) },
            ],
            failures: vec![],
        };

        let hs = table.series(VarModel::HistoricalSimulation);
        assert_eq!(hs.var.len(), 3);
        assert_eq!(hs.missing, 0);

        let qreg = table.series(VarModel::QuantileRegression);
        assert_eq!(qreg.dates, vec![date(1), date(3)]);
        assert_eq!(qreg.var, vec![-1.5, -1.4]);
        assert_eq!(qreg.missing, 1);
    }
}
