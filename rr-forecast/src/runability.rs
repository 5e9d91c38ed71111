//! Scoring a forecast against a run's recommended flow band.

use chrono::NaiveDate;
use rr_core::{prediction::Prediction, river_run::RiverRun};
use serde::Serialize;
use std::fmt;

/// Score reported when there is nothing to compare.
pub const UNKNOWN_SCORE: f64 = -1.0;

/// Distance of `forecast` from the band midpoint, in half-band widths.
///
/// 0 at the midpoint, 1 at either edge, above 1 outside the band. Returns
/// [`UNKNOWN_SCORE`] when the forecast or either edge is missing or the
/// band has zero width.
pub fn runability_score(forecast: Option<f64>, min_level: Option<f64>, max_level: Option<f64>) -> f64 {
    let (Some(f), Some(min), Some(max)) = (forecast, min_level, max_level) else {
        return UNKNOWN_SCORE;
    };
    let midpoint = (max + min) / 2.0;
    let denominator = max - midpoint;
    if denominator == 0.0 || !denominator.is_finite() || !f.is_finite() {
        return UNKNOWN_SCORE;
    }
    (f - midpoint).abs() / denominator
}

/// Display bucket for a runability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Runability {
    Optimal,
    Fair,
    NotRecommended,
    Unknown,
}

impl Runability {
    /// Negative scores are the unknown sentinel; anything at or past a
    /// band edge is not recommended.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s.is_nan() || s < 0.0 => Runability::Unknown,
            s if s < 0.33 => Runability::Optimal,
            s if s < 0.66 => Runability::Fair,
            _ => Runability::NotRecommended,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Runability::Optimal => "optimal",
            Runability::Fair => "fair",
            Runability::NotRecommended => "not_recommended",
            Runability::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Runability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Score and bucket for `today`, using the run's prediction for that day.
pub fn todays_runability(run: &RiverRun, predictions: &[Prediction], today: NaiveDate) -> (f64, Runability) {
    let forecast = predictions
        .iter()
        .find(|p| p.run_id == run.run_id && p.day == today)
        .map(|p| p.forecast_mean);
    let (min, max) = run.flow_band().unzip();
    let score = runability_score(forecast, min, max);
    (score, Runability::from_score(score))
}
