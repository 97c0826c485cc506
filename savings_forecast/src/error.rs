//! Error types for the savings_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the savings_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from parsing a field of the ledger
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A required ledger column is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Too few observations for the requested model order
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Numerical fit did not reach an admissible optimum
    #[error("Convergence error: {0}")]
    ConvergenceError(String),

    /// Every candidate of the order search failed to fit
    #[error("No ARIMA order converged ({0} candidates tried)")]
    NoConvergedOrder(usize),

    /// A model was used before `fit` was called
    #[error("Model has not been fitted")]
    ModelNotFitted,

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    MathError(String),

    /// Error from the configuration file
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error while rendering a chart
    #[error("Plot error: {0}")]
    PlotError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV export
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON serialisation
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl ForecastError {
    /// True for the failures an order search may skip over.
    ///
    /// Anything else (bad input, IO, programming errors) must reach the caller.
    pub fn is_fit_failure(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientData(_) | ForecastError::ConvergenceError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<chrono::ParseError> for ForecastError {
    fn from(err: chrono::ParseError) -> Self {
        ForecastError::ParseError(err.to_string())
    }
}

impl From<std::num::ParseIntError> for ForecastError {
    fn from(err: std::num::ParseIntError) -> Self {
        ForecastError::ParseError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
