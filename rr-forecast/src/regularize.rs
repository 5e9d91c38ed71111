//! Turning aggregated rows into a gap-free daily series.

use crate::aggregate::DailyFeatureRow;
use chrono::Duration;

/// Linearly interpolate every column between two rows, one row per day.
///
/// Returns the days strictly between `start` and `end`.
fn interpolate_between(start: &DailyFeatureRow, end: &DailyFeatureRow) -> Vec<DailyFeatureRow> {
    let days = (end.day - start.day).num_days();
    if days <= 1 {
        return Vec::new();
    }
    let span = days as f64;
    let lerp = |a: f64, b: f64, i: i64| a + (b - a) * i as f64 / span;
    (1..days)
        .map(|i| DailyFeatureRow {
            day: start.day + Duration::days(i),
            flow: lerp(start.flow, end.flow, i),
            temp: lerp(start.temp, end.temp, i),
            precip: lerp(start.precip, end.precip, i),
        })
        .collect()
}

/// A gap-free series plus what it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Regularized {
    pub rows: Vec<DailyFeatureRow>,
    /// Days filled in by interpolation
    pub interpolated: usize,
    /// Rows discarded before long gaps
    pub discarded: usize,
}

/// Make a sorted row sequence gap-free.
///
/// Runs of up to `max_gap_days` missing days are filled by interpolation.
/// A longer gap discards everything before it, so the result is the
/// segment after the last long gap. Rows that do not advance the day are
/// ignored.
pub fn regularize(rows: &[DailyFeatureRow], max_gap_days: u32) -> Regularized {
    let mut result: Vec<DailyFeatureRow> = Vec::with_capacity(rows.len());
    let mut interpolated = 0usize;
    let mut discarded = 0usize;

    for row in rows {
        let Some(prev) = result.last() else {
            result.push(row.clone());
            continue;
        };
        let missing = (row.day - prev.day).num_days() - 1;
        if missing < 0 {
            continue;
        }
        if missing > i64::from(max_gap_days) {
            log::debug!("regularize: {} day gap before {}, discarding {} rows", missing, row.day, result.len());
            discarded += result.len();
            result.clear();
        } else if missing > 0 {
            let filled = interpolate_between(prev, row);
            interpolated += filled.len();
            result.extend(filled);
        }
        result.push(row.clone());
    }

    Regularized {
        rows: result,
        interpolated,
        discarded,
    }
}
