//! The forecast batch job and runability report.

use chrono::{NaiveDate, Utc};
use log::info;
use rr_db::Database;
use rr_forecast::{
    run_batch, select_runs, todays_runability, BatchSummary, ForecastConfig, ForecastEngine, Runability,
};
use rr_utils::dates::parse_date;
use serde::Serialize;
use std::path::Path;

/// Defaults, overridden by the TOML file when one is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ForecastConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let config = ForecastConfig::from_toml_str(&text)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            info!("Loaded forecast config from {}", path.display());
            Ok(config)
        }
        None => Ok(ForecastConfig::default()),
    }
}

/// Forecast all runs, or only `run_id`, and print the batch summary.
pub fn run_forecast(db: &Database, run_id: Option<i64>, config: Option<&Path>) -> anyhow::Result<BatchSummary> {
    let config = load_config(config)?;
    let runs = select_runs(db, run_id)?;
    info!("Forecasting {} runs", runs.len());

    let engine = ForecastEngine::new(config);
    let summary = run_batch(db, &engine, &runs, Utc::now());
    println!(
        "{} runs: {} fitted, {} fallback, {} failed",
        summary.total(),
        summary.fitted,
        summary.fallback,
        summary.failed
    );
    Ok(summary)
}

#[derive(Debug, Serialize)]
pub struct RunabilityRow {
    pub run_id: i64,
    pub run_name: String,
    pub river_name: String,
    pub score: f64,
    pub runability: Runability,
}

/// Score every run against its stored prediction for `day`.
pub fn runability_report(db: &Database, day: NaiveDate) -> anyhow::Result<Vec<RunabilityRow>> {
    let mut rows = Vec::new();
    for run in db.get_all_runs()? {
        let predictions: Vec<_> = db.get_prediction_for_day(run.run_id, day)?.into_iter().collect();
        let (score, runability) = todays_runability(&run, &predictions, day);
        rows.push(RunabilityRow {
            run_id: run.run_id,
            run_name: run.run_name,
            river_name: run.river_name,
            score,
            runability,
        });
    }
    Ok(rows)
}

pub fn run_runability(db: &Database, date: Option<&str>, json: bool) -> anyhow::Result<()> {
    let day = match date {
        Some(s) => parse_date(s)?,
        None => Utc::now().date_naive(),
    };
    let rows = runability_report(db, day)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!(
                "{:>6}  {:<40}  {:>6.2}  {}",
                row.run_id,
                format!("{} ({})", row.run_name, row.river_name),
                row.score,
                row.runability
            );
        }
    }
    Ok(())
}
