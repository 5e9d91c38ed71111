use crate::error::RiverError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The network a station belongs to. Proximity lookups pick the nearest
/// station of each source so every run gets weather and streamflow data.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Noaa,
    Usgs,
    Snow,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Noaa, Source::Usgs, Source::Snow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Noaa => "NOAA",
            Source::Usgs => "USGS",
            Source::Snow => "SNOW",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = RiverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == upper)
            .ok_or_else(|| RiverError::UnknownSource(s.trim().to_string()))
    }
}

/// A fixed-location weather or streamflow sensor.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Station {
    /// USGS site number or weather station identifier
    pub station_id: String,
    pub source: Source,
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Distance between a station and a run's put-in, used to rank stations.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StationDistance {
    pub station_id: String,
    pub run_id: i64,
    pub source: Source,
    /// Distance in miles
    pub distance: f64,
}

/// Choose the stations whose measurements feed a run's forecast.
///
/// `ranked` must be ordered by ascending distance. Without a positive
/// `min_distance` the nearest station of each source is kept; with one, every
/// station strictly closer than the radius is kept (which does not guarantee
/// both weather and streamflow coverage).
pub fn select_stations(ranked: &[StationDistance], min_distance: Option<f64>) -> Vec<String> {
    match min_distance {
        Some(radius) if radius > 0.0 => ranked
            .iter()
            .filter(|s| s.distance < radius)
            .map(|s| s.station_id.clone())
            .collect(),
        _ => {
            let mut seen: Vec<Source> = Vec::with_capacity(Source::ALL.len());
            let mut chosen = Vec::new();
            for station in ranked {
                if !seen.contains(&station.source) {
                    seen.push(station.source);
                    chosen.push(station.station_id.clone());
                }
                if seen.len() == Source::ALL.len() {
                    break;
                }
            }
            chosen
        }
    }
}
