//! Utility functions for the savings_forecast crate

use crate::error::{ForecastError, Result};
use crate::features::{DailyBalanceSeries, DailyFrame, FeatureTable};

/// Training and validation partitions of a daily frame
#[derive(Debug, Clone)]
pub struct TrainValidationSplit {
    /// Index of the first validation row
    pub boundary: usize,
    pub train_features: FeatureTable,
    pub train_series: DailyBalanceSeries,
    pub validation_features: FeatureTable,
    pub validation_series: DailyBalanceSeries,
}

/// Index of the first validation row, `floor(len * train_fraction)`
pub fn split_boundary(len: usize, train_fraction: f64) -> Result<usize> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Train fraction must be between 0 and 1, got {}",
            train_fraction
        )));
    }

    let boundary = (len as f64 * train_fraction).floor() as usize;
    if boundary == 0 || boundary >= len {
        return Err(ForecastError::InsufficientData(format!(
            "Splitting {} rows at {} leaves an empty partition",
            len, train_fraction
        )));
    }

    Ok(boundary)
}

/// Split a daily frame in time order; no row is shuffled across the boundary
pub fn chronological_split(
    frame: &DailyFrame,
    train_fraction: f64,
) -> Result<TrainValidationSplit> {
    let len = frame.len();
    let boundary = split_boundary(len, train_fraction)?;

    Ok(TrainValidationSplit {
        boundary,
        train_features: frame.features.slice(0, boundary),
        train_series: frame.series.slice(0, boundary),
        validation_features: frame.features.slice(boundary, len),
        validation_series: frame.series.slice(boundary, len),
    })
}

/// Apply `d` rounds of first differencing
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Binomial coefficient for small arguments
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}
