//! Derivative-free minimisation used by the ARIMA fit

use crate::error::{ForecastError, Result};

/// Nelder-Mead simplex minimiser
#[derive(Debug, Clone)]
pub struct NelderMead {
    /// Iteration cap; reaching it is a convergence failure
    pub max_iterations: usize,
    /// Relative spread of simplex values at which the search stops
    pub tolerance: f64,
    /// Offset of the initial simplex vertices from the start point
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimise `f` from `start`, returning the best point and its value.
    ///
    /// `f` may return `f64::INFINITY` for inadmissible points.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Result<(Vec<f64>, f64)>
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        if n == 0 {
            return Ok((Vec::new(), f(start)));
        }

        let start_value = f(start);
        if !start_value.is_finite() {
            return Err(ForecastError::ConvergenceError(
                "Objective is not finite at the start point".to_string(),
            ));
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), start_value));
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            let value = f(&vertex);
            simplex.push((vertex, value));
        }

        for _ in 0..self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            if worst - best <= self.tolerance * (1.0 + best.abs()) {
                let (point, value) = simplex.swap_remove(0);
                return Ok((point, value));
            }

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
                .collect();

            let along = |scale: f64, towards: &[f64]| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(towards)
                    .map(|(c, t)| c + scale * (t - c))
                    .collect()
            };

            let reflected = along(-REFLECTION, &simplex[n].0);
            let reflected_value = f(&reflected);

            if reflected_value < best {
                let expanded = along(EXPANSION, &reflected);
                let expanded_value = f(&expanded);
                simplex[n] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
                continue;
            }

            if reflected_value < simplex[n - 1].1 {
                simplex[n] = (reflected, reflected_value);
                continue;
            }

            let (contracted, contracted_value) = if reflected_value < worst {
                let point = along(CONTRACTION, &reflected);
                let value = f(&point);
                (point, value)
            } else {
                let point = along(CONTRACTION, &simplex[n].0);
                let value = f(&point);
                (point, value)
            };

            if contracted_value < reflected_value.min(worst) {
                simplex[n] = (contracted, contracted_value);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk: Vec<f64> = anchor
                    .iter()
                    .zip(&vertex.0)
                    .map(|(a, x)| a + SHRINK * (x - a))
                    .collect();
                vertex.1 = f(&shrunk);
                vertex.0 = shrunk;
            }
        }

        Err(ForecastError::ConvergenceError(format!(
            "Simplex did not converge within {} iterations",
            self.max_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_quadratic_bowl() {
        let optimizer = NelderMead::default();
        let (x, value) = optimizer
            .minimize(|p| (p[0] - 0.3).powi(2) + 2.0 * (p[1] + 0.4).powi(2), &[0.0, 0.0])
            .unwrap();

        assert_approx_eq!(x[0], 0.3, 1e-3);
        assert_approx_eq!(x[1], -0.4, 1e-3);
        assert!(value < 1e-6);
    }

    #[test]
    fn test_iteration_cap_is_a_convergence_failure() {
        let optimizer = NelderMead {
            max_iterations: 1,
            ..NelderMead::default()
        };
        let result = optimizer.minimize(|p| (p[0] - 5.0).powi(2), &[0.0]);
        assert!(matches!(result, Err(ForecastError::ConvergenceError(_))));
    }

    #[test]
    fn test_inadmissible_start() {
        let optimizer = NelderMead::default();
        let result = optimizer.minimize(|_| f64::INFINITY, &[0.0]);
        assert!(matches!(result, Err(ForecastError::ConvergenceError(_))));
    }
}
