//! Persistence for forecast rows.
//!
//! Each prediction is keyed by `(run_id, timestamp)` where the timestamp is
//! midnight UTC of the forecast day, so re-running a forecast for the same
//! days replaces rows instead of duplicating them.

use crate::Database;
use chrono::NaiveDate;
use rr_core::prediction::Prediction;
use rr_utils::dates::{format_timestamp, midnight_utc, parse_timestamp};
use rusqlite::{params, Connection, OptionalExtension};

fn insert_all(conn: &Connection, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO prediction (run_id, timestamp, fr_lb, fr, fr_ub)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for p in predictions {
        stmt.execute(params![
            run_id,
            format_timestamp(&midnight_utc(p.day)),
            p.forecast_low,
            p.forecast_mean,
            p.forecast_high
        ])?;
    }
    Ok(())
}

fn prediction_from_parts(
    run_id: i64,
    timestamp: &str,
    low: f64,
    mean: f64,
    high: f64,
) -> anyhow::Result<Prediction> {
    Ok(Prediction {
        run_id,
        day: parse_timestamp(timestamp)?.date_naive(),
        forecast_low: low,
        forecast_mean: mean,
        forecast_high: high,
    })
}

impl Database {
    /// Upsert predictions for a run in one transaction.
    pub fn put_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        insert_all(&tx, run_id, predictions)?;
        tx.commit()?;
        log::info!("[RR Debug] predictions: stored {} rows for run {}", predictions.len(), run_id);
        Ok(())
    }

    /// Delete every prediction for a run, returning the number removed.
    pub fn clear_predictions(&self, run_id: i64) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let removed = conn.execute("DELETE FROM prediction WHERE run_id = ?1", params![run_id])?;
        Ok(removed)
    }

    /// Delete a run's predictions and insert the new batch in one
    /// transaction. If any insert fails the old rows survive.
    pub fn replace_predictions(&self, run_id: i64, predictions: &[Prediction]) -> anyhow::Result<()> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM prediction WHERE run_id = ?1", params![run_id])?;
        insert_all(&tx, run_id, predictions)?;
        tx.commit()?;
        log::info!(
            "[RR Debug] predictions: replaced {} rows with {} for run {}",
            removed,
            predictions.len(),
            run_id
        );
        Ok(())
    }

    /// Stored predictions for a run, ascending by day.
    pub fn get_predictions(&self, run_id: i64) -> anyhow::Result<Vec<Prediction>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT timestamp, fr_lb, fr, fr_ub FROM prediction
             WHERE run_id = ?1
             ORDER BY timestamp",
        )?;
        let raw = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter()
            .map(|(ts, low, mean, high)| prediction_from_parts(run_id, ts, *low, *mean, *high))
            .collect()
    }

    /// The stored prediction for one run and day, if any.
    pub fn get_prediction_for_day(&self, run_id: i64, day: NaiveDate) -> anyhow::Result<Option<Prediction>> {
        let conn = self.conn.borrow();
        let row = conn
            .query_row(
                "SELECT timestamp, fr_lb, fr, fr_ub FROM prediction
                 WHERE run_id = ?1 AND timestamp = ?2",
                params![run_id, format_timestamp(&midnight_utc(day))],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(ts, low, mean, high)| prediction_from_parts(run_id, &ts, low, mean, high))
            .transpose()
    }
}
