use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One persisted forecast value for a run and day.
///
/// Maps to the `prediction(run_id, timestamp, fr_lb, fr, fr_ub)` table.
/// Historical context days are stored alongside the forecast days, with
/// both bounds equal to the observed value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub run_id: i64,
    pub day: NaiveDate,
    /// Lower bound of the 95% interval (`fr_lb`)
    pub forecast_low: f64,
    /// Point forecast (`fr`)
    pub forecast_mean: f64,
    /// Upper bound of the 95% interval (`fr_ub`)
    pub forecast_high: f64,
}
