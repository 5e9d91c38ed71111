use serde::{Deserialize, Serialize};

/// A navigable stretch of river with a recommended flow band.
///
/// The forecast core only reads runs; they are loaded once from the
/// scraped run catalogue.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RiverRun {
    pub run_id: i64,
    pub run_name: String,
    pub river_name: String,
    pub class_rating: Option<String>,
    /// Lowest recommended flow, cubic feet per second
    pub min_level: Option<f64>,
    /// Highest recommended flow, cubic feet per second
    pub max_level: Option<f64>,
    pub put_in_latitude: f64,
    pub put_in_longitude: f64,
    pub take_out_latitude: Option<f64>,
    pub take_out_longitude: Option<f64>,
    /// Length of the run in miles
    pub distance: Option<f64>,
}

impl RiverRun {
    /// The `(min, max)` recommended flow band, if both edges are known.
    pub fn flow_band(&self) -> Option<(f64, f64)> {
        match (self.min_level, self.max_level) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}
