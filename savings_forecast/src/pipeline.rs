//! End-to-end forecasting run over a ledger

use crate::config::PipelineConfig;
use crate::data::{LedgerLoader, TransactionLedger};
use crate::error::Result;
use crate::features::{DailyBalanceBuilder, DailyBalanceSeries};
use crate::hybrid::{HybridCombiner, PredictionRecord};
use crate::metrics::{self, ErrorMetrics};
use crate::models::order_search::{self, OrderGrid, OrderSearchResult};
use crate::models::random_forest::RandomForestRegressor;
use crate::models::Regressor;
use crate::report::{self, RunSummary};
use crate::utils::chronological_split;
use polars::prelude::DataFrame;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File names of the rendered charts inside the plot directory
pub const BALANCE_HISTORY_PLOT: &str = "balance_history.png";
pub const ACTUAL_VS_PREDICTED_PLOT: &str = "actual_vs_predicted.png";

/// Everything a run produces
#[derive(Debug)]
pub struct RunOutcome {
    /// Full daily balance series before splitting
    pub series: DailyBalanceSeries,
    pub search: OrderSearchResult,
    pub records: Vec<PredictionRecord>,
    pub metrics: ErrorMetrics,
    pub table: DataFrame,
    pub summary: RunSummary,
    /// Charts written during the run
    pub plots: Vec<PathBuf>,
}

/// Load a ledger CSV and run the pipeline on it
pub fn run<P: AsRef<Path>>(ledger_path: P, config: &PipelineConfig) -> Result<RunOutcome> {
    let ledger = LedgerLoader::from_csv(ledger_path)?;
    run_ledger(&ledger, config)
}

/// Run the pipeline on an already loaded ledger
pub fn run_ledger(ledger: &TransactionLedger, config: &PipelineConfig) -> Result<RunOutcome> {
    config.validate()?;

    let frame = DailyBalanceBuilder::build(ledger)?;
    let split = chronological_split(&frame, config.train_fraction)?;
    info!(
        train = split.train_series.len(),
        validation = split.validation_series.len(),
        "split daily series"
    );

    let mut forest = RandomForestRegressor::new(config.n_estimators)
        .with_random_state(config.random_state);
    forest.fit(&split.train_features.matrix(), split.train_series.balances())?;
    info!(trees = forest.n_trees(), "trained random forest");

    let grid = OrderGrid::uniform(config.max_order);
    let (search, mut arima) =
        order_search::fit_best(split.train_series.balances(), &grid, config.criterion)?;

    let records = HybridCombiner::combine(
        &forest,
        &mut arima,
        &split.validation_features,
        &split.validation_series,
    )?;
    let metrics = metrics::evaluate(&records)?;
    let table = report::comparison_table(&records)?;

    let mut plots = Vec::new();
    if let Some(dir) = &config.plot_dir {
        fs::create_dir_all(dir)?;

        let history = dir.join(BALANCE_HISTORY_PLOT);
        report::plot_balance_history(&frame.series, &history)?;
        plots.push(history);

        let comparison = dir.join(ACTUAL_VS_PREDICTED_PLOT);
        report::plot_actual_vs_predicted(&records, &comparison)?;
        plots.push(comparison);
    }

    let importances = report::named_importances(forest.feature_importances().unwrap_or(&[]));
    let summary = RunSummary::new(
        &search,
        &frame.report,
        split.train_series.len(),
        split.validation_series.len(),
        &metrics,
        importances,
    );
    info!(mae = metrics.mae, rmse = metrics.rmse, "run finished");

    Ok(RunOutcome {
        series: frame.series,
        search,
        records,
        metrics,
        table,
        summary,
        plots,
    })
}
