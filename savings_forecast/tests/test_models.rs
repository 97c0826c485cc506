use assert_approx_eq::assert_approx_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use savings_forecast::models::arima::{ArimaModel, ArimaOrder};
use savings_forecast::models::order_search::{
    fit_best, search_orders, InformationCriterion, OrderGrid,
};
use savings_forecast::models::random_forest::{MaxFeatures, RandomForestRegressor};
use savings_forecast::{ForecastError, ForecastModel, Regressor, TrainedForecastModel};

// Balance-like series: a random walk with drift
fn synthetic_balance(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let shocks = Normal::new(2.0, 15.0).unwrap();
    let mut balance = 1000.0;
    (0..len)
        .map(|_| {
            balance += shocks.sample(&mut rng);
            balance
        })
        .collect()
}

#[test]
fn test_selected_order_minimises_criterion() {
    let series = synthetic_balance(120, 11);

    for criterion in [InformationCriterion::Aic, InformationCriterion::Bic] {
        let result = search_orders(&series, &OrderGrid::uniform(1), criterion).unwrap();

        assert!(!result.candidates.is_empty());
        assert_eq!(result.candidates.len() + result.skipped.len(), 8);
        assert!(result
            .candidates
            .iter()
            .all(|c| result.best_score <= c.score));
        assert!(result.candidates.iter().any(|c| c.order == result.best));
    }
}

#[test]
fn test_fit_best_refits_winner() {
    let series = synthetic_balance(90, 5);
    let (search, model) =
        fit_best(&series, &OrderGrid::uniform(1), InformationCriterion::Aic).unwrap();

    assert_eq!(model.order(), search.best);
    assert_approx_eq!(model.aic(), search.best_score, 1e-9);
    assert_eq!(model.history(), series.as_slice());
}

#[test]
fn test_too_short_series_has_no_converged_order() {
    let result = search_orders(&[1.0, 2.0], &OrderGrid::uniform(2), InformationCriterion::Aic);
    assert!(matches!(result, Err(ForecastError::NoConvergedOrder(27))));
}

#[test]
fn test_observe_changes_next_forecast() {
    let series = synthetic_balance(80, 3);
    let mut model = ArimaModel::new(1, 1, 0).train(&series).unwrap();

    let first = model.forecast_next().unwrap();
    model.observe(first + 100.0).unwrap();
    let second = model.forecast_next().unwrap();

    assert_eq!(model.history().len(), 81);
    assert!((second - first).abs() > 1.0);
}

#[test]
fn test_forecast_does_not_advance_history() {
    let series = synthetic_balance(60, 8);
    let model = ArimaModel::new(0, 1, 1).train(&series).unwrap();

    let path = model.forecast(4).unwrap();
    assert_eq!(path.horizons(), 4);
    assert_eq!(path.mean_absolute_error(path.values()).unwrap(), 0.0);
    assert!(matches!(
        path.mean_absolute_error(&[1.0]),
        Err(ForecastError::ValidationError(_))
    ));
    assert_eq!(model.history().len(), 60);
    assert_approx_eq!(model.forecast_next().unwrap(), path.values()[0], 1e-9);
}

#[test]
fn test_order_display() {
    assert_eq!(ArimaOrder::new(2, 1, 0).to_string(), "ARIMA(2,1,0)");
}

#[test]
fn test_random_forest_on_feature_rows() {
    // Target depends only on the first feature
    let x: Vec<Vec<f64>> = (0..60)
        .map(|i| vec![(i % 12) as f64, (i % 7) as f64, 5.0])
        .collect();
    let y: Vec<f64> = x.iter().map(|r| if r[0] < 6.0 { 10.0 } else { 50.0 }).collect();

    let mut forest = RandomForestRegressor::new(20)
        .with_random_state(Some(42))
        .with_max_features(MaxFeatures::All);
    forest.fit(&x, &y).unwrap();

    assert_eq!(forest.n_trees(), 20);
    assert_approx_eq!(forest.predict_row(&[2.0, 3.0, 5.0]).unwrap(), 10.0, 1.0);
    assert_approx_eq!(forest.predict_row(&[9.0, 3.0, 5.0]).unwrap(), 50.0, 1.0);

    let importances = forest.feature_importances().unwrap();
    assert_approx_eq!(importances.iter().sum::<f64>(), 1.0, 1e-9);
    assert!(importances[0] > importances[1]);
    assert_eq!(importances[2], 0.0);
}

#[test]
fn test_forest_wrong_width_row() {
    let x = vec![vec![1.0, 2.0], vec![2.0, 3.0], vec![3.0, 1.0]];
    let mut forest = RandomForestRegressor::new(3).with_random_state(Some(1));
    forest.fit(&x, &[1.0, 2.0, 3.0]).unwrap();

    assert!(matches!(
        forest.predict_row(&[1.0]),
        Err(ForecastError::ValidationError(_))
    ));
}
