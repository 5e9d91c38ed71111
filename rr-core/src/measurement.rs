use crate::error::RiverError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The observed quantity of a measurement, keyed by the codes stored in the
/// `metric` table.
///
/// Weather stations report temperature, humidity and precipitation hourly;
/// USGS gauges report discharge every 15 minutes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    /// Mean air temperature, degrees Fahrenheit
    #[serde(rename = "00001")]
    Temperature,
    /// Relative humidity, fraction 0-1
    #[serde(rename = "00002")]
    Humidity,
    /// Precipitation intensity, inches per hour
    #[serde(rename = "00003")]
    Precipitation,
    /// Streamflow discharge, cubic feet per second
    #[serde(rename = "00060")]
    Discharge,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Precipitation,
        Metric::Discharge,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Metric::Temperature => "00001",
            Metric::Humidity => "00002",
            Metric::Precipitation => "00003",
            Metric::Discharge => "00060",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Precipitation => "precipitation intensity",
            Metric::Discharge => "discharge",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Metric::Temperature => "F",
            Metric::Humidity => "fraction",
            Metric::Precipitation => "in/hr",
            Metric::Discharge => "ft3/s",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Metric {
    type Err = RiverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| RiverError::UnknownMetric(s.to_string()))
    }
}

/// A single scalar observation from a station.
///
/// Uniquely keyed by `(station_id, metric, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub station_id: String,
    pub metric: Metric,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Measurement {
    pub fn new(station_id: &str, metric: Metric, timestamp: DateTime<Utc>, value: f64) -> Self {
        Measurement {
            station_id: station_id.to_string(),
            metric,
            timestamp,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_ids_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.id().parse::<Metric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_unknown_metric_is_rejected() {
        let err = "00065".parse::<Metric>().unwrap_err();
        assert_eq!(err.to_string(), "unknown metric id: 00065");
    }

    #[test]
    fn test_metric_serializes_as_code() {
        let json = serde_json::to_string(&Metric::Discharge).unwrap();
        assert_eq!(json, "\"00060\"");
    }
}
