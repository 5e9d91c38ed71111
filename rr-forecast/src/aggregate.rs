//! Daily resampling of raw measurements into model features.

use chrono::NaiveDate;
use rr_core::measurement::{Measurement, Metric};
use serde::Serialize;
use std::collections::BTreeMap;

/// One calendar day of model inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFeatureRow {
    pub day: NaiveDate,
    /// Mean discharge, ft3/s
    pub flow: f64,
    /// Mean air temperature
    pub temp: f64,
    /// Summed precipitation intensity
    pub precip: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    sum: f64,
    count: u32,
}

impl Bucket {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }

    fn total(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct DayBuckets {
    flow: Bucket,
    temp: Bucket,
    precip: Bucket,
}

/// Accumulates measurements into per-day buckets.
///
/// Flow and temperature are averaged, precipitation is summed. A day is
/// emitted only when all three metrics were observed that day and every
/// aggregate is finite; missing days are absent, never filled.
#[derive(Debug, Default)]
pub struct DailyAggregator {
    days: BTreeMap<NaiveDate, DayBuckets>,
}

impl DailyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, measurement: &Measurement) {
        let day = measurement.timestamp.date_naive();
        let buckets = self.days.entry(day).or_default();
        match measurement.metric {
            Metric::Discharge => buckets.flow.add(measurement.value),
            Metric::Temperature => buckets.temp.add(measurement.value),
            Metric::Precipitation => buckets.precip.add(measurement.value),
            Metric::Humidity => {}
        }
    }

    /// Complete rows, ascending by day.
    pub fn finish(self) -> Vec<DailyFeatureRow> {
        let total = self.days.len();
        let rows: Vec<DailyFeatureRow> = self
            .days
            .into_iter()
            .filter_map(|(day, b)| {
                let row = DailyFeatureRow {
                    day,
                    flow: b.flow.mean()?,
                    temp: b.temp.mean()?,
                    precip: b.precip.total()?,
                };
                (row.flow.is_finite() && row.temp.is_finite() && row.precip.is_finite()).then_some(row)
            })
            .collect();
        log::debug!("aggregate: {} of {} observed days are complete", rows.len(), total);
        rows
    }
}

/// Resample `measurements` into complete daily feature rows.
pub fn aggregate_daily(measurements: &[Measurement]) -> Vec<DailyFeatureRow> {
    let mut aggregator = DailyAggregator::new();
    for m in measurements {
        aggregator.push(m);
    }
    aggregator.finish()
}
