//! # Savings Forecast
//!
//! A Rust library for forecasting the daily balance of a bank account from its
//! transaction ledger.
//!
//! ## Features
//!
//! - Ledger loading from CSV with column and timestamp validation
//! - Daily balance series with forward-filled gaps and calendar features
//! - Random forest regression on calendar features
//! - ARIMA(p, d, q) with exhaustive order search by AIC or BIC
//! - Hybrid walk-forward prediction over a chronological validation window
//! - Error metrics, comparison table, PNG charts and CSV/JSON exports
//!
//! ## Hybrid Prediction
//!
//! For every validation day the forest estimates the balance from the
//! calendar features, the ARIMA model forecasts one step ahead, and the
//! hybrid prediction is their difference. The ARIMA history then takes in
//! the actual balance before the next day is forecast.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use savings_forecast::config::PipelineConfig;
//! use savings_forecast::pipeline;
//!
//! let config = PipelineConfig {
//!     plot_dir: None,
//!     ..PipelineConfig::default()
//! };
//!
//! let outcome = pipeline::run("transactions.csv", &config)?;
//! println!("{}", outcome.metrics);
//! println!("{}", outcome.table);
//! # Ok::<(), savings_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod hybrid;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{LedgerLoader, Transaction, TransactionLedger};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{DailyBalanceBuilder, DailyBalanceSeries, DailyFrame, FeatureTable};
pub use crate::hybrid::{HybridCombiner, PredictionRecord};
pub use crate::metrics::ErrorMetrics;
pub use crate::models::{ForecastModel, ForecastResult, Regressor, TrainedForecastModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
