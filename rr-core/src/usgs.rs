//! USGS NWIS instantaneous-values client.
//!
//! See: <https://waterservices.usgs.gov/docs/instantaneous-values/>

use crate::{
    error::RiverError,
    measurement::{Measurement, Metric},
};
use log::debug;
use rr_utils::dates::parse_timestamp;
use serde::Deserialize;

#[cfg(feature = "api")]
use crate::retry::{get_text_with_retry, RetryPolicy};
#[cfg(feature = "api")]
use chrono::NaiveDate;
#[cfg(feature = "api")]
use reqwest::Client;

/// Base URL of the instantaneous-values service.
pub const USGS_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/iv/";

/// Metrics requested from every USGS site during ingestion.
pub const USGS_METRICS: [Metric; 3] = [Metric::Precipitation, Metric::Discharge, Metric::Temperature];

/// Value USGS reports when a sensor had no reading.
pub const NO_DATA_SENTINEL: f64 = -999999.0;

#[derive(Debug, Deserialize)]
struct IvResponse {
    value: IvValue,
}

#[derive(Debug, Deserialize)]
struct IvValue {
    #[serde(rename = "timeSeries", default)]
    time_series: Vec<IvTimeSeries>,
}

#[derive(Debug, Deserialize)]
struct IvTimeSeries {
    #[serde(default)]
    values: Vec<IvValueBlock>,
}

#[derive(Debug, Deserialize)]
struct IvValueBlock {
    #[serde(default)]
    value: Vec<IvPoint>,
}

#[derive(Debug, Deserialize)]
struct IvPoint {
    value: String,
    #[serde(rename = "dateTime")]
    date_time: String,
}

/// Parse an IV JSON response for one site and parameter into measurements.
///
/// Only the first time series is read, matching a single-site,
/// single-parameter request. Non-numeric values and the `-999999` sentinel
/// are skipped; an unparseable timestamp is an error.
pub fn parse_iv_response(
    body: &str,
    site_id: &str,
    metric: Metric,
) -> Result<Vec<Measurement>, RiverError> {
    let response: IvResponse = serde_json::from_str(body)?;
    let points = response
        .value
        .time_series
        .into_iter()
        .next()
        .and_then(|series| series.values.into_iter().next())
        .map(|block| block.value)
        .unwrap_or_default();

    let mut measurements = Vec::with_capacity(points.len());
    let mut skipped = 0u32;
    for point in points {
        let value = match point.value.trim().parse::<f64>() {
            Ok(v) if v != NO_DATA_SENTINEL && v.is_finite() => v,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let timestamp = parse_timestamp(&point.date_time)
            .map_err(|e| RiverError::InvalidFormat(e.to_string()))?;
        measurements.push(Measurement::new(site_id, metric, timestamp, value));
    }
    debug!(
        "usgs: parsed {} values for {} {}, skipped {}",
        measurements.len(),
        site_id,
        metric,
        skipped
    );
    Ok(measurements)
}

/// Fetch instantaneous values for one site and metric over `[start, end]`.
#[cfg(feature = "api")]
pub async fn fetch_usgs_measurements(
    client: &Client,
    site_id: &str,
    metric: Metric,
    start: &NaiveDate,
    end: &NaiveDate,
    policy: &RetryPolicy,
) -> Result<Vec<Measurement>, RiverError> {
    let query = [
        ("format", "json".to_string()),
        ("sites", site_id.to_string()),
        ("startDT", rr_utils::dates::format_date(start)),
        ("endDT", rr_utils::dates::format_date(end)),
        ("parameterCd", metric.id().to_string()),
        ("siteStatus", "all".to_string()),
    ];
    let label = format!("USGS {} {}", site_id, metric);
    let body = get_text_with_retry(client, USGS_BASE_URL, &query, policy, &label).await?;
    parse_iv_response(&body, site_id, metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV_BODY: &str = r#"{
  "name": "ns1:timeSeriesResponseType",
  "value": {
    "timeSeries": [{
      "sourceInfo": {"siteName": "SKYKOMISH RIVER NEAR GOLD BAR, WA"},
      "variable": {"variableCode": [{"value": "00060"}]},
      "values": [{
        "value": [
          {"value": "4350", "qualifiers": ["P"], "dateTime": "2018-05-01T00:00:00.000-07:00"},
          {"value": "4380", "qualifiers": ["P"], "dateTime": "2018-05-01T00:15:00.000-07:00"},
          {"value": "-999999", "qualifiers": ["P"], "dateTime": "2018-05-01T00:30:00.000-07:00"},
          {"value": "Ice", "qualifiers": ["P"], "dateTime": "2018-05-01T00:45:00.000-07:00"}
        ]
      }]
    }]
  }
}"#;

    #[test]
    fn test_parse_iv_response() {
        let measurements = parse_iv_response(IV_BODY, "12134500", Metric::Discharge).unwrap();
        assert_eq!(measurements.len(), 2, "sentinel and non-numeric values are skipped");
        assert_eq!(measurements[0].station_id, "12134500");
        assert_eq!(measurements[0].metric, Metric::Discharge);
        assert!((measurements[1].value - 4380.0).abs() < f64::EPSILON);
        assert_eq!(
            rr_utils::dates::format_timestamp(&measurements[0].timestamp),
            "2018-05-01 07:00:00"
        );
    }

    #[test]
    fn test_parse_iv_response_without_series() {
        let body = r#"{"value": {"timeSeries": []}}"#;
        let measurements = parse_iv_response(body, "12134500", Metric::Discharge).unwrap();
        assert!(measurements.is_empty());
    }

    #[test]
    fn test_parse_iv_response_bad_json() {
        let result = parse_iv_response("<html>busy</html>", "12134500", Metric::Discharge);
        assert!(matches!(result, Err(RiverError::ResponseParse(_))));
    }

    #[test]
    fn test_parse_iv_response_bad_timestamp() {
        let body = r#"{"value": {"timeSeries": [{"values": [{"value": [
            {"value": "12.0", "dateTime": "last tuesday"}
        ]}]}]}}"#;
        let result = parse_iv_response(body, "12134500", Metric::Discharge);
        assert!(matches!(result, Err(RiverError::InvalidFormat(_))));
    }
}
