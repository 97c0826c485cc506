//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use crate::hybrid::PredictionRecord;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::ValidationError(format!(
            "Actual ({}) and predicted ({}) values must have the same non-zero length",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Mean squared error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}

/// Coefficient of determination.
///
/// A constant `actual` scores 1.0 for an exact prediction and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let mean = actual.iter().mean();

    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Error metrics of a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// Mean Absolute Error of the hybrid prediction
    pub mae: f64,
    /// Mean Squared Error of the hybrid prediction
    pub mse: f64,
    /// Root Mean Squared Error of the hybrid prediction
    pub rmse: f64,
    /// R² of the hybrid prediction
    pub r2: f64,
    /// MAE of the regression-only prediction
    pub regression_mae: f64,
    /// MAE of the time-series-only prediction
    pub time_series_mae: f64,
}

/// Score prediction records against their actual balances
pub fn evaluate(records: &[PredictionRecord]) -> Result<ErrorMetrics> {
    let actual: Vec<f64> = records.iter().map(|r| r.actual).collect();
    let hybrid: Vec<f64> = records.iter().map(|r| r.hybrid).collect();
    let regression: Vec<f64> = records.iter().map(|r| r.regression).collect();
    let time_series: Vec<f64> = records.iter().map(|r| r.time_series).collect();

    Ok(ErrorMetrics {
        mae: mean_absolute_error(&actual, &hybrid)?,
        mse: mean_squared_error(&actual, &hybrid)?,
        rmse: root_mean_squared_error(&actual, &hybrid)?,
        r2: r2_score(&actual, &hybrid)?,
        regression_mae: mean_absolute_error(&actual, &regression)?,
        time_series_mae: mean_absolute_error(&actual, &time_series)?,
    })
}

impl std::fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Hybrid Forecast Metrics:")?;
        writeln!(f, "  MAE:        {:.4}", self.mae)?;
        writeln!(f, "  MSE:        {:.4}", self.mse)?;
        writeln!(f, "  RMSE:       {:.4}", self.rmse)?;
        writeln!(f, "  R2:         {:.4}", self.r2)?;
        writeln!(f, "  RF MAE:     {:.4}", self.regression_mae)?;
        writeln!(f, "  ARIMA MAE:  {:.4}", self.time_series_mae)?;
        Ok(())
    }
}
