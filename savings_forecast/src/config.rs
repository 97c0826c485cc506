//! Pipeline configuration

use crate::error::{ForecastError, Result};
use crate::models::order_search::InformationCriterion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters for a forecasting run.
///
/// Every field has a default, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Share of daily rows used for training
    pub train_fraction: f64,
    /// Number of trees in the random forest
    pub n_estimators: usize,
    /// Seed for bootstrap sampling; `None` draws from entropy
    pub random_state: Option<u64>,
    /// Upper bound (inclusive) for each of p, d and q in the order search
    pub max_order: usize,
    /// Criterion used to rank ARIMA candidates
    pub criterion: InformationCriterion,
    /// Directory for rendered charts; `None` disables plotting
    pub plot_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.70,
            n_estimators: 100,
            random_state: Some(42),
            max_order: 2,
            criterion: InformationCriterion::Aic,
            plot_dir: Some(PathBuf::from("plots")),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all parameters are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_fraction must be between 0 and 1, got {}",
                self.train_fraction
            )));
        }
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.train_fraction, 0.70);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.max_order, 2);
        assert_eq!(config.criterion, InformationCriterion::Aic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config =
            PipelineConfig::from_toml_str("n_estimators = 25\ncriterion = \"bic\"\n").unwrap();
        assert_eq!(config.n_estimators, 25);
        assert_eq!(config.criterion, InformationCriterion::Bic);
        assert_eq!(config.train_fraction, 0.70);
        assert_eq!(config.random_state, Some(42));
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let result = PipelineConfig::from_toml_str("train_fraction = 1.5");
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));

        let result = PipelineConfig::from_toml_str("train_fraction = \"high\"");
        assert!(matches!(result, Err(ForecastError::ConfigError(_))));
    }
}
