//! Tables, charts and exports of a forecasting run

use crate::error::{ForecastError, Result};
use crate::features::{BuildReport, DailyBalanceSeries, FeatureRow};
use crate::hybrid::PredictionRecord;
use crate::metrics::ErrorMetrics;
use crate::models::arima::ArimaOrder;
use crate::models::order_search::{InformationCriterion, OrderSearchResult, SkippedOrder};
use plotters::prelude::*;
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const CHART_SIZE: (u32, u32) = (1280, 720);

/// Side-by-side view of actual and predicted balances
pub fn comparison_table(records: &[PredictionRecord]) -> Result<DataFrame> {
    let dates: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
    let actual: Vec<f64> = records.iter().map(|r| r.actual).collect();
    let hybrid: Vec<f64> = records.iter().map(|r| r.hybrid).collect();
    let regression: Vec<f64> = records.iter().map(|r| r.regression).collect();
    let time_series: Vec<f64> = records.iter().map(|r| r.time_series).collect();

    let df = DataFrame::new(vec![
        Series::new("Date", dates),
        Series::new("Actual", actual),
        Series::new("Prediction", hybrid),
        Series::new("RF-Pred", regression),
        Series::new("ARIMA-Pred", time_series),
    ])?;
    Ok(df)
}

/// Write the prediction records as CSV with a header row
pub fn export_csv<P: AsRef<Path>>(records: &[PredictionRecord], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), rows = records.len(), "exported predictions");
    Ok(())
}

/// Value range padded so a flat line still gets a drawable axis
fn value_range<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> std::ops::Range<f64> {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let pad = ((max - min) * 0.05).max(1.0);
    (min - pad)..(max + pad)
}

/// Render the daily balance over time as a PNG line chart
pub fn plot_balance_history<P: AsRef<Path>>(series: &DailyBalanceSeries, path: P) -> Result<()> {
    if series.is_empty() {
        return Err(ForecastError::PlotError(
            "Cannot plot an empty balance series".to_string(),
        ));
    }
    draw_balance_history(series, path.as_ref())
        .map_err(|e| ForecastError::PlotError(e.to_string()))?;
    info!(path = %path.as_ref().display(), "saved balance history chart");
    Ok(())
}

fn draw_balance_history(
    series: &DailyBalanceSeries,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let dates = series.dates();
    let balances = series.balances();

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Balance History", ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0usize..balances.len(), value_range(balances))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Balance")
        .x_label_formatter(&|i| dates.get(*i).map(|d| d.to_string()).unwrap_or_default())
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            balances.iter().enumerate().map(|(i, b)| (i, *b)),
            &BLUE,
        ))?
        .label("Balance")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart.configure_series_labels().border_style(&BLACK).draw()?;
    root.present()?;
    Ok(())
}

/// Render actual (blue) against hybrid prediction (red) over the validation days
pub fn plot_actual_vs_predicted<P: AsRef<Path>>(
    records: &[PredictionRecord],
    path: P,
) -> Result<()> {
    if records.is_empty() {
        return Err(ForecastError::PlotError(
            "Cannot plot an empty prediction set".to_string(),
        ));
    }
    draw_actual_vs_predicted(records, path.as_ref())
        .map_err(|e| ForecastError::PlotError(e.to_string()))?;
    info!(path = %path.as_ref().display(), "saved actual vs predicted chart");
    Ok(())
}

fn draw_actual_vs_predicted(
    records: &[PredictionRecord],
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let y_range = value_range(records.iter().flat_map(|r| [&r.actual, &r.hybrid]));
    let mut chart = ChartBuilder::on(&root)
        .caption("Actual vs Predicted Balance", ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(1usize..records.len() + 1, y_range)?;

    chart.configure_mesh().x_desc("Day").y_desc("Balance").draw()?;

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i + 1, r.actual)),
            &BLUE,
        ))?
        .label("Actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i + 1, r.hybrid)),
            &RED,
        ))?
        .label("Predicted")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart.configure_series_labels().border_style(&BLACK).draw()?;
    root.present()?;
    Ok(())
}

/// Share of the forest's impurity decrease credited to one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair importances with the calendar feature names, largest first
pub fn named_importances(importances: &[f64]) -> Vec<FeatureImportance> {
    let mut named: Vec<FeatureImportance> = FeatureRow::NAMES
        .iter()
        .zip(importances)
        .map(|(name, &importance)| FeatureImportance {
            feature: name.to_string(),
            importance,
        })
        .collect();
    named.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    named
}

/// Machine-readable summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub order: ArimaOrder,
    pub criterion: InformationCriterion,
    pub criterion_value: f64,
    pub fitted_orders: usize,
    pub skipped_orders: Vec<SkippedOrder>,
    pub train_days: usize,
    pub validation_days: usize,
    pub build: BuildReport,
    pub metrics: ErrorMetrics,
    pub feature_importances: Vec<FeatureImportance>,
}

impl RunSummary {
    pub fn new(
        search: &OrderSearchResult,
        build: &BuildReport,
        train_days: usize,
        validation_days: usize,
        metrics: &ErrorMetrics,
        feature_importances: Vec<FeatureImportance>,
    ) -> Self {
        Self {
            order: search.best,
            criterion: search.criterion,
            criterion_value: search.best_score,
            fitted_orders: search.candidates.len(),
            skipped_orders: search.skipped.clone(),
            train_days,
            validation_days,
            build: build.clone(),
            metrics: metrics.clone(),
            feature_importances,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
