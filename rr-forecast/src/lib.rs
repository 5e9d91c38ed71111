//! The RiverRunner forecast pipeline.
//!
//! Raw measurements for a run are resampled into daily feature rows
//! ([`aggregate`]), made gap-free ([`regularize`]), and handed to the
//! [`engine`], which fits a regression with ARMA errors ([`regression`],
//! [`arma`]) and forecasts the next week of flow. When no model can be
//! fitted the engine falls back to repeating the last observed flow.
//! [`pipeline`] runs this for every run against the store traits and
//! persists the result; [`runability`] scores the stored forecast against
//! a run's flow band.

pub mod aggregate;
pub mod arma;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod regression;
pub mod regularize;
pub mod runability;

pub use aggregate::{aggregate_daily, DailyAggregator, DailyFeatureRow};
pub use config::ForecastConfig;
pub use engine::{ForecastEngine, ForecastOutcome, ForecastResult};
pub use pipeline::{forecast_run, run_batch, select_runs, BatchSummary};
pub use runability::{runability_score, todays_runability, Runability, UNKNOWN_SCORE};
