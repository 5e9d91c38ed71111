//! Hourly weather observations in the DarkSky "time machine" response format.

use crate::{
    error::RiverError,
    measurement::{Measurement, Metric},
};
use chrono::DateTime;
use serde::Deserialize;

#[cfg(feature = "api")]
use crate::{
    retry::{get_text_with_retry, RetryPolicy},
    station::Station,
};
#[cfg(feature = "api")]
use chrono::NaiveDate;
#[cfg(feature = "api")]
use reqwest::Client;

/// Default base URL of the hourly weather service.
pub const WEATHER_BASE_URL: &str = "https://api.darksky.net/forecast";

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    data: Vec<HourlyPoint>,
}

#[derive(Debug, Deserialize)]
struct HourlyPoint {
    /// Unix seconds
    time: i64,
    #[serde(rename = "precipIntensity")]
    precip_intensity: Option<f64>,
    temperature: Option<f64>,
    humidity: Option<f64>,
}

/// Parse one day of hourly observations for a station.
///
/// Every hour yields up to three measurements (precipitation, temperature,
/// humidity); fields absent from the response are skipped.
pub fn parse_hourly_response(body: &str, station_id: &str) -> Result<Vec<Measurement>, RiverError> {
    let response: HourlyResponse = serde_json::from_str(body)?;
    let mut measurements = Vec::with_capacity(response.hourly.data.len() * 3);
    for hour in response.hourly.data {
        let timestamp = DateTime::from_timestamp(hour.time, 0)
            .ok_or_else(|| RiverError::InvalidFormat(format!("unix time out of range: {}", hour.time)))?;
        let readings = [
            (Metric::Precipitation, hour.precip_intensity),
            (Metric::Temperature, hour.temperature),
            (Metric::Humidity, hour.humidity),
        ];
        for (metric, value) in readings {
            if let Some(value) = value.filter(|v| v.is_finite()) {
                measurements.push(Measurement::new(station_id, metric, timestamp, value));
            }
        }
    }
    Ok(measurements)
}

/// Fetch the hourly observations for `day` at a weather station's location.
#[cfg(feature = "api")]
pub async fn fetch_hourly_observations(
    client: &Client,
    base_url: &str,
    api_key: &str,
    station: &Station,
    day: &NaiveDate,
    policy: &RetryPolicy,
) -> Result<Vec<Measurement>, RiverError> {
    let url = format!(
        "{}/{}/{},{},{}T00:00:00",
        base_url.trim_end_matches('/'),
        api_key,
        station.latitude,
        station.longitude,
        rr_utils::dates::format_date(day)
    );
    let label = format!("weather {}", station.station_id);
    let body = get_text_with_retry(client, &url, &[], policy, &label).await?;
    parse_hourly_response(&body, &station.station_id)
}
