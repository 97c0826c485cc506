//! Exhaustive ARIMA order selection

use crate::error::{ForecastError, Result};
use crate::models::arima::{ArimaModel, ArimaOrder, TrainedArimaModel};
use crate::models::ForecastModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Score used to rank fitted candidates; lower is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    Aic,
    Bic,
}

impl InformationCriterion {
    pub fn score(&self, model: &TrainedArimaModel) -> f64 {
        match self {
            InformationCriterion::Aic => model.aic(),
            InformationCriterion::Bic => model.bic(),
        }
    }
}

/// Inclusive upper bounds of the (p, d, q) grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderGrid {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
}

impl OrderGrid {
    /// Grid with the same bound for every order
    pub fn uniform(max: usize) -> Self {
        Self {
            max_p: max,
            max_d: max,
            max_q: max,
        }
    }

    /// Candidates with p varying slowest and q fastest
    pub fn candidates(&self) -> Vec<ArimaOrder> {
        let mut orders = Vec::with_capacity((self.max_p + 1) * (self.max_d + 1) * (self.max_q + 1));
        for p in 0..=self.max_p {
            for d in 0..=self.max_d {
                for q in 0..=self.max_q {
                    orders.push(ArimaOrder::new(p, d, q));
                }
            }
        }
        orders
    }
}

impl Default for OrderGrid {
    fn default() -> Self {
        Self::uniform(2)
    }
}

/// Criterion value of a successfully fitted candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub order: ArimaOrder,
    pub score: f64,
}

/// Candidate that failed to fit, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedOrder {
    pub order: ArimaOrder,
    pub reason: String,
}

/// Outcome of an order search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSearchResult {
    pub criterion: InformationCriterion,
    pub best: ArimaOrder,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
    pub skipped: Vec<SkippedOrder>,
}

/// Fit every order of the grid and keep the lowest-scoring one.
///
/// Only fit failures (too little data, non-convergence) are skipped; any
/// other error aborts the search. Ties keep the earlier candidate.
pub fn search_orders(
    series: &[f64],
    grid: &OrderGrid,
    criterion: InformationCriterion,
) -> Result<OrderSearchResult> {
    let orders = grid.candidates();
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();

    for order in &orders {
        let trained = match ArimaModel::from_order(*order).train(series) {
            Ok(trained) => trained,
            Err(e) if e.is_fit_failure() => {
                debug!(%order, reason = %e, "skipping order");
                skipped.push(SkippedOrder {
                    order: *order,
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let score = criterion.score(&trained);
        debug!(%order, score, "fitted order");
        candidates.push(CandidateScore {
            order: *order,
            score,
        });
    }

    let best = select_best(candidates.iter().cloned())
        .ok_or(ForecastError::NoConvergedOrder(orders.len()))?;
    info!(
        order = %best.order,
        score = best.score,
        fitted = candidates.len(),
        skipped = skipped.len(),
        "selected ARIMA order"
    );

    Ok(OrderSearchResult {
        criterion,
        best: best.order,
        best_score: best.score,
        candidates,
        skipped,
    })
}

/// Lowest-scoring candidate; on equal scores the earliest one is kept
pub fn select_best<I>(scored: I) -> Option<CandidateScore>
where
    I: IntoIterator<Item = CandidateScore>,
{
    let mut best: Option<CandidateScore> = None;
    for candidate in scored {
        if best.as_ref().map_or(true, |b| candidate.score < b.score) {
            best = Some(candidate);
        }
    }
    best
}

/// Search the grid, then refit the winning order once on the full series
pub fn fit_best(
    series: &[f64],
    grid: &OrderGrid,
    criterion: InformationCriterion,
) -> Result<(OrderSearchResult, TrainedArimaModel)> {
    let search = search_orders(series, grid, criterion)?;
    let model = ArimaModel::from_order(search.best).train(series)?;
    Ok((search, model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_order_and_size() {
        let orders = OrderGrid::default().candidates();
        assert_eq!(orders.len(), 27);
        assert_eq!(orders[0], ArimaOrder::new(0, 0, 0));
        assert_eq!(orders[1], ArimaOrder::new(0, 0, 1));
        assert_eq!(orders[3], ArimaOrder::new(0, 1, 0));
        assert_eq!(orders[26], ArimaOrder::new(2, 2, 2));
    }

    #[test]
    fn test_constant_series_fails_every_order() {
        let result = search_orders(&[42.0; 30], &OrderGrid::default(), InformationCriterion::Aic);
        assert!(matches!(result, Err(ForecastError::NoConvergedOrder(27))));
    }

    #[test]
    fn test_data_errors_are_not_swallowed() {
        let result = search_orders(
            &[1.0, f64::NAN, 3.0],
            &OrderGrid::default(),
            InformationCriterion::Aic,
        );
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    fn scored(scores: &[f64]) -> Vec<CandidateScore> {
        OrderGrid::default()
            .candidates()
            .into_iter()
            .zip(scores)
            .map(|(order, &score)| CandidateScore { order, score })
            .collect()
    }

    #[test]
    fn test_select_best_keeps_first_of_tied_minimum() {
        let best = select_best(scored(&[3.0, 1.0, 1.0])).unwrap();
        assert_eq!(best.order, ArimaOrder::new(0, 0, 1));
        assert_eq!(best.score, 1.0);
    }

    #[test]
    fn test_select_best_all_equal_keeps_first_order() {
        let best = select_best(scored(&[5.0; 27])).unwrap();
        assert_eq!(best.order, ArimaOrder::new(0, 0, 0));
    }

    #[test]
    fn test_select_best_of_nothing() {
        assert!(select_best(Vec::new()).is_none());
    }
}
