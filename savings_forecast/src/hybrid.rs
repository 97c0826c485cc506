//! Combines the regression and time-series estimates day by day

use crate::error::{ForecastError, Result};
use crate::features::{DailyBalanceSeries, FeatureTable};
use crate::models::{Regressor, TrainedForecastModel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Predictions for one validation day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Actual")]
    pub actual: f64,
    /// Regression estimate minus time-series forecast
    #[serde(rename = "Prediction")]
    pub hybrid: f64,
    #[serde(rename = "RF-Pred")]
    pub regression: f64,
    #[serde(rename = "ARIMA-Pred")]
    pub time_series: f64,
}

/// Walks the validation window one day at a time
#[derive(Debug)]
pub struct HybridCombiner;

impl HybridCombiner {
    /// Produce one record per validation day.
    ///
    /// After each day the time-series model observes the actual balance, so
    /// every forecast is one step ahead of the known history.
    pub fn combine<R, M>(
        regressor: &R,
        time_series: &mut M,
        features: &FeatureTable,
        series: &DailyBalanceSeries,
    ) -> Result<Vec<PredictionRecord>>
    where
        R: Regressor + ?Sized,
        M: TrainedForecastModel + ?Sized,
    {
        if features.len() != series.len() {
            return Err(ForecastError::ValidationError(format!(
                "Feature rows ({}) don't match validation days ({})",
                features.len(),
                series.len()
            )));
        }

        let mut records = Vec::with_capacity(series.len());
        for ((row, &date), &actual) in features
            .rows()
            .iter()
            .zip(series.dates())
            .zip(series.balances())
        {
            let regression = regressor.predict_row(&row.to_vec())?;
            let forecast = time_series.forecast_next()?;
            time_series.observe(actual)?;

            records.push(PredictionRecord {
                date,
                actual,
                hybrid: regression - forecast,
                regression,
                time_series: forecast,
            });
        }

        info!(
            days = records.len(),
            model = time_series.name(),
            "combined validation predictions"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;
    use crate::models::ForecastResult;

    #[derive(Debug)]
    struct ConstantRegressor(f64);

    impl Regressor for ConstantRegressor {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<()> {
            Ok(())
        }

        fn predict_row(&self, _row: &[f64]) -> Result<f64> {
            Ok(self.0)
        }
    }

    /// Forecasts the last observed value
    #[derive(Debug)]
    struct LastValue(Vec<f64>);

    impl TrainedForecastModel for LastValue {
        fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
            let last = *self.0.last().ok_or(ForecastError::ModelNotFitted)?;
            ForecastResult::new(vec![last; horizons], horizons)
        }

        fn observe(&mut self, value: f64) -> Result<()> {
            self.0.push(value);
            Ok(())
        }

        fn name(&self) -> &str {
            "last value"
        }
    }

    fn validation_window() -> (FeatureTable, DailyBalanceSeries) {
        let start = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..3).map(|i| start + chrono::Duration::days(i)).collect();
        let rows = dates
            .iter()
            .map(|d| FeatureRow::from_datetime(d.and_hms_opt(9, 0, 0).unwrap()))
            .collect();
        let series = DailyBalanceSeries::new(dates, vec![110.0, 130.0, 120.0]).unwrap();
        (FeatureTable::new(rows), series)
    }

    #[test]
    fn test_hybrid_is_regression_minus_forecast() {
        let (features, series) = validation_window();
        let mut model = LastValue(vec![100.0]);

        let records =
            HybridCombiner::combine(&ConstantRegressor(500.0), &mut model, &features, &series)
                .unwrap();

        let forecasts: Vec<f64> = records.iter().map(|r| r.time_series).collect();
        assert_eq!(forecasts, vec![100.0, 110.0, 130.0]);
        for record in &records {
            assert_eq!(record.hybrid, record.regression - record.time_series);
        }
        assert_eq!(model.0, vec![100.0, 110.0, 130.0, 120.0]);
    }

    #[test]
    fn test_mismatched_window() {
        let (features, _) = validation_window();
        let short = DailyBalanceSeries::new(
            vec![NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()],
            vec![1.0],
        )
        .unwrap();
        let mut model = LastValue(vec![0.0]);

        let result =
            HybridCombiner::combine(&ConstantRegressor(0.0), &mut model, &features, &short);
        assert!(matches!(result, Err(ForecastError::ValidationError(_))));
    }
}
