//! Store trait implementations backed by SQLite.

use crate::Database;
use chrono::{DateTime, Utc};
use rr_core::{
    measurement::Measurement,
    prediction::Prediction,
    river_run::RiverRun,
    store::{MeasurementStore, PredictionStore, RunCatalog},
};

impl RunCatalog for Database {
    fn get_all_runs(&self) -> anyhow::Result<Vec<RiverRun>> {
        Database::get_all_runs(self)
    }

    fn get_run(&self, run_id: i64) -> anyhow::Result<RiverRun> {
        Database::get_run(self, run_id)
    }
}

impl MeasurementStore for Database {
    fn get_measurements(
        &self,
        run_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_distance: Option<f64>,
    ) -> anyhow::Result<Vec<Measurement>> {
        self.get_measurements_at(run_id, start, end, min_distance, Utc::now())
    }
}

impl PredictionStore for Database {
    fn put_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
        Database::put_predictions(self, run_id, predictions)
    }

    fn clear_predictions(&self, run_id: i64) -> anyhow::Result<usize> {
        Database::clear_predictions(self, run_id)
    }

    fn replace_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
        Database::replace_predictions(self, run_id, predictions)
    }

    fn get_predictions(&self, run_id: i64) -> anyhow::Result<Vec<Prediction>> {
        Database::get_predictions(self, run_id)
    }
}
