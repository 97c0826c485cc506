//! Savings Forecast - command line entry point

use anyhow::Context;
use clap::Parser;
use savings_forecast::config::PipelineConfig;
use savings_forecast::{pipeline, report};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "savings-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forecast daily account balances from a transaction ledger")]
struct Args {
    /// Transaction ledger CSV
    ledger: PathBuf,

    /// TOML file overriding the default pipeline parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the rendered charts
    #[arg(long = "plot-dir")]
    plot_dir: Option<PathBuf>,

    /// Skip rendering charts
    #[arg(long = "no-plots")]
    no_plots: bool,

    /// Write the prediction records to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the run summary as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "savings_forecast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.plot_dir {
        config.plot_dir = Some(dir);
    }
    if args.no_plots {
        config.plot_dir = None;
    }

    let outcome = pipeline::run(&args.ledger, &config)
        .with_context(|| format!("forecast failed for {}", args.ledger.display()))?;

    if let Some(path) = &args.export {
        report::export_csv(&outcome.records, path)
            .with_context(|| format!("failed to export {}", path.display()))?;
    }

    if args.json {
        println!("{}", outcome.summary.to_json()?);
    } else {
        println!(
            "Selected {} ({:?} = {:.4})",
            outcome.search.best, outcome.search.criterion, outcome.search.best_score
        );
        println!("{}", outcome.metrics);
        println!("Feature importances:");
        for entry in &outcome.summary.feature_importances {
            println!("  {:<10} {:.4}", entry.feature, entry.importance);
        }
        println!();
        println!("{}", outcome.table);
        for plot in &outcome.plots {
            println!("Saved {}", plot.display());
        }
    }

    Ok(())
}
