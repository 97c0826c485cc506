//! ARIMA models for time series forecasting

use crate::error::{ForecastError, Result};
use crate::models::optimizer::NelderMead;
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::{binomial, difference};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use std::fmt;

/// Order (p, d, q) of an ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
///
/// Coefficients are estimated by conditional sum of squares: the series is
/// differenced `d` times, centred on its sample mean when `d == 0`, and the
/// squared one-step residuals are minimised over the AR and MA terms.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ArimaOrder,
    /// Optimiser used for the coefficient search
    optimizer: NelderMead,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ArimaOrder,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series (zero when d > 0)
    mean: f64,
    /// Residual variance
    sigma2: f64,
    /// Residuals used in the likelihood
    n_residuals: usize,
    /// Conditional Gaussian log-likelihood
    log_likelihood: f64,
    /// Observations on the original scale, training data first
    history: Vec<f64>,
    /// Differenced and centred observations
    centered: Vec<f64>,
    /// One-step residuals aligned with `centered`
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_order(ArimaOrder::new(p, d, q))
    }

    /// Create a model for an existing order
    pub fn from_order(order: ArimaOrder) -> Self {
        Self {
            name: order.to_string(),
            order,
            optimizer: NelderMead::default(),
        }
    }

    /// Replace the coefficient optimiser
    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &[f64]) -> Result<TrainedArimaModel> {
        let ArimaOrder { p, d, q } = self.order;

        if series.is_empty() {
            return Err(ForecastError::DataError(
                "Empty time series data".to_string(),
            ));
        }
        if let Some(pos) = series.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Non-finite observation at index {}",
                pos
            )));
        }

        let include_mean = d == 0;
        let n_params = p + q + usize::from(include_mean);
        let differenced = difference(series, d);
        let n_residuals = differenced.len().saturating_sub(p);
        if n_residuals <= n_params + 1 {
            return Err(ForecastError::InsufficientData(format!(
                "{} needs more than {} usable observations, got {}",
                self.name,
                n_params + 1,
                n_residuals
            )));
        }

        let mean = if include_mean {
            differenced.iter().sum::<f64>() / differenced.len() as f64
        } else {
            0.0
        };
        let centered: Vec<f64> = differenced.iter().map(|w| w - mean).collect();

        let objective = |params: &[f64]| -> f64 {
            let (ar, ma) = params.split_at(p);
            if !is_stationary(ar) || !is_invertible(ma) {
                return f64::INFINITY;
            }
            let sse = sum_of_squares(&conditional_residuals(&centered, ar, ma)[p..]);
            if sse.is_finite() {
                sse
            } else {
                f64::INFINITY
            }
        };

        let (params, sse) = self.optimizer.minimize(objective, &vec![0.0; p + q])?;
        let (ar, ma) = params.split_at(p);

        if !is_stationary(ar) {
            return Err(ForecastError::ConvergenceError(format!(
                "{} AR polynomial is not stationary",
                self.name
            )));
        }
        if !is_invertible(ma) {
            return Err(ForecastError::ConvergenceError(format!(
                "{} MA polynomial is not invertible",
                self.name
            )));
        }

        let sigma2 = sse / n_residuals as f64;
        if !(sigma2.is_finite() && sigma2 > 0.0) {
            return Err(ForecastError::ConvergenceError(format!(
                "{} has degenerate residual variance {}",
                self.name, sigma2
            )));
        }

        let residuals = conditional_residuals(&centered, ar, ma);
        let n = n_residuals as f64;
        let log_likelihood = -0.5 * n * ((2.0 * PI).ln() + sigma2.ln() + 1.0);

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order: self.order,
            ar_coefficients: ar.to_vec(),
            ma_coefficients: ma.to_vec(),
            mean,
            sigma2,
            n_residuals,
            log_likelihood,
            history: series.to_vec(),
            centered,
            residuals,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Mean of the differenced series; only estimated when d == 0
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Estimated parameters including the residual variance
    pub fn n_parameters(&self) -> usize {
        self.order.p + self.order.q + usize::from(self.order.d == 0) + 1
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.n_parameters() as f64
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood + self.n_parameters() as f64 * (self.n_residuals as f64).ln()
    }

    /// Observations seen so far, training data included
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Point forecasts with normal-theory intervals at `level` (e.g. 0.95)
    pub fn forecast_with_intervals(&self, horizons: usize, level: f64) -> Result<ForecastResult> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::ValidationError(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }

        let point = self.forecast(horizons)?;
        let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::MathError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + level / 2.0);

        let psi = self.psi_weights(horizons);
        let mut cumulative = 0.0;
        let intervals = point
            .values()
            .iter()
            .zip(&psi)
            .map(|(value, weight)| {
                cumulative += weight * weight;
                let margin = z * (self.sigma2 * cumulative).sqrt();
                (value - margin, value + margin)
            })
            .collect();

        ForecastResult::new_with_intervals(point.values, horizons, intervals)
    }

    /// MA(infinity) weights of the integrated model
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        // Expand phi(B) * (1 - B)^d into y_t = sum a_i * y_{t-i} + ...
        let d = self.order.d;
        let mut ar_poly = vec![1.0];
        ar_poly.extend(self.ar_coefficients.iter().map(|c| -c));
        let diff_poly: Vec<f64> = (0..=d)
            .map(|k| {
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                sign * binomial(d, k)
            })
            .collect();

        let mut expanded = vec![0.0; ar_poly.len() + diff_poly.len() - 1];
        for (i, a) in ar_poly.iter().enumerate() {
            for (j, b) in diff_poly.iter().enumerate() {
                expanded[i + j] += a * b;
            }
        }

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut weight = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..expanded.len().min(j + 1) {
                weight += -expanded[i] * psi[j - i];
            }
            psi.push(weight);
        }
        psi
    }

    /// Forecast of the next centred, differenced value
    fn next_centered(&self) -> f64 {
        let t = self.centered.len();
        let ar_part: f64 = self
            .ar_coefficients
            .iter()
            .enumerate()
            .filter_map(|(i, phi)| t.checked_sub(i + 1).map(|idx| phi * self.centered[idx]))
            .sum();
        let ma_part: f64 = self
            .ma_coefficients
            .iter()
            .enumerate()
            .filter_map(|(j, theta)| t.checked_sub(j + 1).map(|idx| theta * self.residuals[idx]))
            .sum();
        ar_part + ma_part
    }

    /// Map a differenced value back to the original scale
    fn integrate(&self, differenced: f64) -> f64 {
        let d = self.order.d;
        let n = self.history.len();
        (1..=d).fold(differenced, |acc, k| {
            let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
            acc + sign * binomial(d, k) * self.history[n - k]
        })
    }

    /// Differenced value ending at the latest observation
    fn latest_difference(&self) -> f64 {
        let d = self.order.d;
        let n = self.history.len();
        (0..=d)
            .map(|k| {
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                sign * binomial(d, k) * self.history[n - 1 - k]
            })
            .sum()
    }

    fn push(&mut self, value: f64, residual: Option<f64>) {
        let predicted = self.next_centered();
        self.history.push(value);
        let centered = self.latest_difference() - self.mean;
        self.centered.push(centered);
        self.residuals.push(residual.unwrap_or(centered - predicted));
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        if self.history.is_empty() {
            return Err(ForecastError::ModelNotFitted);
        }

        let mut path = self.clone();
        let mut forecasts = Vec::with_capacity(horizons);
        for _ in 0..horizons {
            let value = path.integrate(path.next_centered() + path.mean);
            // Future shocks have expectation zero
            path.push(value, Some(0.0));
            forecasts.push(value);
        }

        ForecastResult::new(forecasts, horizons)
    }

    fn observe(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(ForecastError::DataError(format!(
                "Cannot observe non-finite value {}",
                value
            )));
        }
        self.push(value, None);
        Ok(())
    }

    fn forecast_next(&self) -> Result<f64> {
        if self.history.is_empty() {
            return Err(ForecastError::ModelNotFitted);
        }
        Ok(self.integrate(self.next_centered() + self.mean))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One-step residuals of an ARMA recursion; the first `ar.len()` are zero
fn conditional_residuals(centered: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; centered.len()];

    for t in p..centered.len() {
        let mut predicted = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            predicted += phi * centered[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if let Some(idx) = t.checked_sub(j + 1) {
                predicted += theta * residuals[idx];
            }
        }
        residuals[t] = centered[t] - predicted;
    }

    residuals
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Check that `1 - sum c_i B^i` has all roots outside the unit circle.
///
/// Steps the polynomial down to its reflection coefficients; the process is
/// stationary iff every one lies strictly inside (-1, 1).
pub fn is_stationary(coefficients: &[f64]) -> bool {
    let mut poly = coefficients.to_vec();
    while let Some(&kappa) = poly.last() {
        if !kappa.is_finite() || kappa.abs() >= 1.0 {
            return false;
        }
        let k = poly.len();
        let denom = 1.0 - kappa * kappa;
        poly = (0..k - 1)
            .map(|j| (poly[j] + kappa * poly[k - 2 - j]) / denom)
            .collect();
    }
    true
}

/// Check that `1 + sum c_j B^j` has all roots outside the unit circle
pub fn is_invertible(coefficients: &[f64]) -> bool {
    let negated: Vec<f64> = coefficients.iter().map(|c| -c).collect();
    is_stationary(&negated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as Gaussian};

    fn ar1_series(phi: f64, len: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Gaussian::new(0.0, 1.0).unwrap();
        let mut values = vec![0.0];
        for i in 1..len {
            values.push(phi * values[i - 1] + noise.sample(&mut rng));
        }
        values
    }

    #[test]
    fn test_stationarity_region() {
        assert!(is_stationary(&[]));
        assert!(is_stationary(&[0.5]));
        assert!(!is_stationary(&[1.0]));
        assert!(is_stationary(&[0.5, 0.3]));
        assert!(!is_stationary(&[0.7, 0.4]));
        assert!(!is_stationary(&[0.0, -1.2]));
        assert!(is_invertible(&[-0.9]));
        assert!(!is_invertible(&[1.5]));
    }

    #[test]
    fn test_ar1_coefficient_is_recovered() {
        let series = ar1_series(0.6, 400);
        let trained = ArimaModel::new(1, 0, 0).train(&series).unwrap();
        assert_approx_eq!(trained.ar_coefficients()[0], 0.6, 0.15);
        assert!(trained.aic().is_finite());
        assert!(trained.bic() > trained.aic());
    }

    #[test]
    fn test_random_walk_forecast_is_last_value() {
        let series = vec![3.0, 5.0, 4.0, 6.0, 8.0, 7.0, 9.0, 10.0];
        let trained = ArimaModel::new(0, 1, 0).train(&series).unwrap();
        assert_approx_eq!(trained.forecast_next().unwrap(), 10.0);
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let series = vec![50.0; 12];
        let result = ArimaModel::new(0, 1, 0).train(&series);
        assert!(matches!(result, Err(ForecastError::ConvergenceError(_))));
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let result = ArimaModel::new(2, 1, 2).train(&[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
    }

    #[test]
    fn test_iteration_cap_is_a_convergence_error() {
        let series = ar1_series(0.6, 100);
        let optimizer = NelderMead {
            max_iterations: 1,
            ..NelderMead::default()
        };
        let result = ArimaModel::new(1, 0, 1).with_optimizer(optimizer).train(&series);
        assert!(matches!(result, Err(ForecastError::ConvergenceError(_))));
    }

    #[test]
    fn test_empty_series_is_a_data_error() {
        let result = ArimaModel::new(0, 0, 0).train(&[]);
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    #[test]
    fn test_observe_moves_the_forecast() {
        let series = ar1_series(0.5, 60);
        let mut trained = ArimaModel::new(1, 1, 0).train(&series).unwrap();
        let before = trained.forecast_next().unwrap();
        trained.observe(before + 25.0).unwrap();
        let after = trained.forecast_next().unwrap();

        assert_eq!(trained.history().len(), 61);
        assert!((after - before).abs() > 1.0);
    }

    #[test]
    fn test_intervals_widen_with_horizon() {
        let series = ar1_series(0.4, 120);
        let trained = ArimaModel::new(1, 1, 0).train(&series).unwrap();
        let result = trained.forecast_with_intervals(5, 0.95).unwrap();
        let widths: Vec<f64> = result
            .intervals()
            .unwrap()
            .iter()
            .map(|(lo, hi)| hi - lo)
            .collect();

        assert_eq!(widths.len(), 5);
        assert!(widths.windows(2).all(|w| w[1] >= w[0]));
    }
}
