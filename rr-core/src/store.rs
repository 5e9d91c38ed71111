//! Store traits consumed by the forecast pipeline.
//!
//! Handles are constructed by the caller and passed in, so the pipeline can
//! run against the SQLite database or an in-memory test double.

use crate::{measurement::Measurement, prediction::Prediction, river_run::RiverRun};
use chrono::{DateTime, Utc};

/// Read access to the river run catalogue.
pub trait RunCatalog {
    fn get_all_runs(&self) -> anyhow::Result<Vec<RiverRun>>;

    /// Fails with [`RiverError::UnknownRun`](crate::error::RiverError::UnknownRun)
    /// when no run has this id.
    fn get_run(&self, run_id: i64) -> anyhow::Result<RiverRun>;
}

/// Time-stamped observations, filtered by proximity to a run's put-in.
pub trait MeasurementStore {
    /// Measurements in `[start, end)` from the stations selected for `run_id`.
    ///
    /// Without a positive `min_distance`, the nearest station of each source
    /// is used; otherwise all stations closer than `min_distance`.
    fn get_measurements(
        &self,
        run_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_distance: Option<f64>,
    ) -> anyhow::Result<Vec<Measurement>>;
}

/// Persisted forecasts, one row per run per day.
pub trait PredictionStore {
    fn put_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()>;

    /// Returns the number of rows removed.
    fn clear_predictions(&self, run_id: i64) -> anyhow::Result<usize>;

    /// Atomically swap a run's predictions for a new batch. On error the
    /// previous predictions are left in place.
    fn replace_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()>;

    /// Stored predictions for a run, ascending by day.
    fn get_predictions(&self, run_id: i64) -> anyhow::Result<Vec<Prediction>>;
}
