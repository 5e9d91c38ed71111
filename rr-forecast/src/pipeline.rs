//! The batch job: aggregate, fit, forecast and persist every run.

use crate::{
    aggregate::aggregate_daily,
    engine::{ForecastEngine, ForecastOutcome, ForecastResult},
    regularize::{regularize, Regularized},
};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rr_core::{
    river_run::RiverRun,
    store::{MeasurementStore, PredictionStore, RunCatalog},
};
use rr_utils::dates::lookback_window;
use serde::Serialize;

/// Per-outcome run counts for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub fitted: usize,
    pub fallback: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.fitted + self.fallback + self.failed
    }
}

/// The runs a batch should cover: one run when `only` is set, otherwise
/// the whole catalogue.
pub fn select_runs<C: RunCatalog>(catalog: &C, only: Option<i64>) -> anyhow::Result<Vec<RiverRun>> {
    match only {
        Some(run_id) => Ok(vec![catalog.get_run(run_id)?]),
        None => catalog.get_all_runs(),
    }
}

/// Forecast one run as of `now` and replace its stored predictions.
///
/// Errors come from the store or from a run with no complete days; model
/// failures are absorbed by the engine.
pub fn forecast_run<S>(store: &S, engine: &ForecastEngine, run: &RiverRun, now: DateTime<Utc>) -> anyhow::Result<ForecastResult>
where
    S: MeasurementStore + PredictionStore,
{
    let (start, end) = lookback_window(now, engine.config().lookback_days);
    let measurements = store.get_measurements(run.run_id, start, end, None)?;
    let daily = aggregate_daily(&measurements);
    let Regularized {
        rows,
        interpolated,
        discarded,
    } = regularize(&daily, engine.config().max_gap_days);
    info!(
        "[RR Debug] pipeline: run {} has {} measurements, {} usable days ({} interpolated)",
        run.run_id,
        measurements.len(),
        rows.len(),
        interpolated
    );
    if discarded > 0 {
        warn!(
            "run {} ({}): discarded {} days before a gap longer than {} days, {} remain",
            run.run_id,
            run.run_name,
            discarded,
            engine.config().max_gap_days,
            rows.len()
        );
    }
    if rows.is_empty() {
        anyhow::bail!("no complete days of measurements");
    }

    let result = engine.forecast(&rows)?;
    store.replace_predictions(run.run_id, &result.to_predictions(run.run_id))?;
    Ok(result)
}

/// Forecast every run in turn. A failing run is logged and counted; it
/// never stops the batch.
pub fn run_batch<S>(store: &S, engine: &ForecastEngine, runs: &[RiverRun], now: DateTime<Utc>) -> BatchSummary
where
    S: MeasurementStore + PredictionStore,
{
    let mut summary = BatchSummary::default();
    for run in runs {
        match forecast_run(store, engine, run, now) {
            Ok(result) => match &result.outcome {
                ForecastOutcome::Fitted { order, aic } => {
                    info!("run {} ({}): fitted {} with AIC {:.1}", run.run_id, run.run_name, order, aic);
                    summary.fitted += 1;
                }
                ForecastOutcome::Fallback { stage, reason } => {
                    warn!(
                        "run {} ({}): {} failed, persisted last-flow forecast: {}",
                        run.run_id, run.run_name, stage, reason
                    );
                    summary.fallback += 1;
                }
            },
            Err(e) => {
                error!("run {} ({}): forecast failed: {:#}", run.run_id, run.run_name, e);
                summary.failed += 1;
            }
        }
    }
    info!(
        "Forecast batch complete: {} fitted, {} fallback, {} failed",
        summary.fitted, summary.fallback, summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ForecastConfig, testutil::sine_rows};
    use chrono::{Duration, TimeZone};
    use rr_core::{
        measurement::{Measurement, Metric},
        prediction::Prediction,
    };
    use rr_db::Database;
    use rr_utils::dates::midnight_utc;
    use std::{cell::RefCell, collections::HashMap};

    /// Measurements for `rows`, two readings per metric per day.
    fn measurements_for(rows: &[crate::aggregate::DailyFeatureRow], usgs: &str, noaa: &str) -> Vec<Measurement> {
        let mut out = Vec::new();
        for row in rows {
            let base = midnight_utc(row.day);
            for hour in [6, 18] {
                let ts = base + Duration::hours(hour);
                out.push(Measurement::new(usgs, Metric::Discharge, ts, row.flow));
                out.push(Measurement::new(noaa, Metric::Temperature, ts, row.temp));
                out.push(Measurement::new(noaa, Metric::Precipitation, ts, row.precip / 2.0));
            }
        }
        out
    }

    fn run(run_id: i64) -> RiverRun {
        RiverRun {
            run_id,
            run_name: format!("run {}", run_id),
            river_name: "Skykomish".to_string(),
            class_rating: None,
            min_level: Some(80.0),
            max_level: Some(120.0),
            put_in_latitude: 47.85,
            put_in_longitude: -121.69,
            take_out_latitude: None,
            take_out_longitude: None,
            distance: None,
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        measurements: HashMap<i64, Vec<Measurement>>,
        predictions: RefCell<HashMap<i64, Vec<Prediction>>>,
        reject_writes_for: Option<i64>,
    }

    impl MeasurementStore for MemoryStore {
        fn get_measurements(
            &self,
            run_id: i64,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            _min_distance: Option<f64>,
        ) -> anyhow::Result<Vec<Measurement>> {
            let Some(all) = self.measurements.get(&run_id) else {
                anyhow::bail!("run_id does not exist: {}", run_id);
            };
            Ok(all
                .iter()
                .filter(|m| m.timestamp >= start && m.timestamp < end)
                .cloned()
                .collect())
        }
    }

    impl PredictionStore for MemoryStore {
        fn put_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
            self.predictions
                .borrow_mut()
                .entry(run_id)
                .or_default()
                .extend_from_slice(predictions);
            Ok(())
        }

        fn clear_predictions(&self, run_id: i64) -> anyhow::Result<usize> {
            Ok(self.predictions.borrow_mut().remove(&run_id).map_or(0, |p| p.len()))
        }

        fn replace_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
            if self.reject_writes_for == Some(run_id) {
                anyhow::bail!("disk full");
            }
            self.predictions.borrow_mut().insert(run_id, predictions.to_vec());
            Ok(())
        }

        fn get_predictions(&self, run_id: i64) -> anyhow::Result<Vec<Prediction>> {
            Ok(self.predictions.borrow().get(&run_id).cloned().unwrap_or_default())
        }
    }

    fn now_after(rows: &[crate::aggregate::DailyFeatureRow]) -> DateTime<Utc> {
        midnight_utc(rows.last().unwrap().day) + Duration::days(1) + Duration::hours(9)
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let rows = sine_rows(90, 41);
        let mut store = MemoryStore {
            reject_writes_for: Some(3),
            ..Default::default()
        };
        store.measurements.insert(1, measurements_for(&rows, "G1", "W1"));
        store.measurements.insert(3, measurements_for(&rows, "G3", "W3"));
        store.measurements.insert(4, measurements_for(&rows[..3], "G4", "W4"));

        let engine = ForecastEngine::new(ForecastConfig::default());
        let runs = vec![run(1), run(2), run(3), run(4)];
        let summary = run_batch(&store, &engine, &runs, now_after(&rows));

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.failed, 2, "unknown run 2 and rejected write for run 3");
        assert_eq!(summary.fitted + summary.fallback, 2);
        assert_eq!(store.get_predictions(1).unwrap().len(), 28);
        assert_eq!(store.get_predictions(4).unwrap().len(), 10, "3 history days and 7 forecast days");
        assert!(store.get_predictions(3).unwrap().is_empty());
    }

    #[test]
    fn test_today_is_excluded_from_history() {
        let rows = sine_rows(40, 43);
        let mut store = MemoryStore::default();
        store.measurements.insert(1, measurements_for(&rows, "G1", "W1"));

        let engine = ForecastEngine::new(ForecastConfig::default());
        let last = rows.last().unwrap().day;
        let now = midnight_utc(last) + Duration::hours(12);
        let result = forecast_run(&store, &engine, &run(1), now).unwrap();
        let first_forecast = result.forecast_points().next().unwrap();
        assert_eq!(first_forecast.day, last, "the partial current day is forecast, not observed");
    }

    #[test]
    fn test_long_gap_limits_history_to_latest_segment() {
        let rows = sine_rows(60, 45);
        let mut measurements = measurements_for(&rows[..40], "G1", "W1");
        measurements.extend(measurements_for(&rows[50..], "G1", "W1"));
        let mut store = MemoryStore::default();
        store.measurements.insert(1, measurements);

        let engine = ForecastEngine::new(ForecastConfig::default());
        let result = forecast_run(&store, &engine, &run(1), now_after(&rows)).unwrap();
        assert_eq!(result.points.len(), 17, "10 days after the gap and 7 forecast days");
        assert_eq!(result.points[0].day, rows[50].day);
    }

    #[test]
    fn test_batch_against_sqlite_is_idempotent() {
        let db = Database::new().unwrap();
        db.load_runs(
            "run_id,run_name,river_name,class_rating,min_level,max_level,put_in_latitude,put_in_longitude,take_out_latitude,take_out_longitude,distance\n\
             599,Gold Bar to Sultan,Skykomish,II,80,120,47.85,-121.69,47.86,-121.81,8.0\n",
        )
        .unwrap();
        db.load_stations(
            "station_id,source,name,latitude,longitude\n\
             12134500,USGS,Skykomish River near Gold Bar,47.837,-121.666\n\
             KSEA,NOAA,Seattle-Tacoma International Airport,47.444,-122.314\n",
        )
        .unwrap();
        db.load_station_distances("station_id,run_id,distance\n12134500,599,1.2\nKSEA,599,30.5\n")
            .unwrap();
        let rows = sine_rows(120, 47);
        db.put_measurements(&measurements_for(&rows, "12134500", "KSEA")).unwrap();

        let engine = ForecastEngine::new(ForecastConfig::default());
        let runs = db.get_all_runs().unwrap();
        let now = now_after(&rows);
        let first = run_batch(&db, &engine, &runs, now);
        let second = run_batch(&db, &engine, &runs, now);

        assert_eq!(first, second);
        assert_eq!(first.failed, 0);
        let stored = db.get_predictions(599).unwrap();
        assert_eq!(stored.len(), 28);
        assert_eq!(stored[20].day, rows.last().unwrap().day);
        assert!(stored.iter().all(|p| p.forecast_low <= p.forecast_mean && p.forecast_mean <= p.forecast_high));
    }

    #[test]
    fn test_select_runs_from_catalog() {
        let db = Database::new().unwrap();
        db.load_runs(
            "run_id,run_name,river_name,class_rating,min_level,max_level,put_in_latitude,put_in_longitude,take_out_latitude,take_out_longitude,distance\n\
             599,Gold Bar to Sultan,Skykomish,II,80,120,47.85,-121.69,,,\n\
             477,Sunset Falls,Skykomish,IV,,,47.80,-121.56,,,\n",
        )
        .unwrap();
        assert_eq!(select_runs(&db, None).unwrap().len(), 2);
        assert_eq!(select_runs(&db, Some(477)).unwrap()[0].run_name, "Sunset Falls");
        assert!(select_runs(&db, Some(1)).is_err());
    }

    #[test]
    fn test_summary_counts_fallbacks() {
        let start = Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap();
        let flat: Vec<Measurement> = (0..30)
            .flat_map(|d| {
                let ts = start + Duration::days(d) + Duration::hours(12);
                [
                    Measurement::new("G", Metric::Discharge, ts, 250.0),
                    Measurement::new("W", Metric::Temperature, ts, 50.0),
                    Measurement::new("W", Metric::Precipitation, ts, 0.0),
                ]
            })
            .collect();
        let mut store = MemoryStore::default();
        store.measurements.insert(9, flat);

        let engine = ForecastEngine::new(ForecastConfig::default());
        let summary = run_batch(&store, &engine, &[run(9)], start + Duration::days(31));
        assert_eq!(
            summary,
            BatchSummary {
                fitted: 0,
                fallback: 1,
                failed: 0
            }
        );
        let stored = store.get_predictions(9).unwrap();
        assert!(stored.iter().all(|p| p.forecast_mean == 250.0));
    }
}
