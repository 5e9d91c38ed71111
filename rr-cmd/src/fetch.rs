//! Ingestion from the USGS and hourly weather services.

use chrono::{Duration, NaiveDate, Utc};
use log::{info, warn};
use rr_core::{
    retry::RetryPolicy,
    station::Source,
    usgs::{fetch_usgs_measurements, USGS_METRICS},
    weather::fetch_hourly_observations,
};
use rr_db::Database;
use rr_utils::dates::{parse_date, DayRange};

/// Pause between weather requests; the service bills per call.
const WEATHER_REQUEST_SPACING_MS: u64 = 500;

/// Resolve `--start`/`--end`, each defaulting to yesterday (UTC).
pub fn resolve_days(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let yesterday = today - Duration::days(1);
    let start = start.map(parse_date).transpose()?.unwrap_or(yesterday);
    let end = end.map(parse_date).transpose()?.unwrap_or(yesterday);
    if end < start {
        anyhow::bail!("end {} is before start {}", end, start);
    }
    Ok((start, end))
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?)
}

/// Fetch discharge, precipitation and temperature for every USGS station.
///
/// A station/metric that keeps failing is logged and skipped.
pub async fn run_fetch_usgs(db: &Database, start: Option<&str>, end: Option<&str>, max_tries: u32) -> anyhow::Result<()> {
    let (start, end) = resolve_days(start, end, Utc::now().date_naive())?;
    let stations = db.get_all_stations(Some(Source::Usgs))?;
    let client = http_client()?;
    let policy = RetryPolicy {
        max_tries,
        ..RetryPolicy::default()
    };

    info!("Fetching USGS values for {} stations from {} to {}", stations.len(), start, end);

    let mut stored = 0usize;
    let mut failures = 0usize;
    for station in &stations {
        for metric in USGS_METRICS {
            match fetch_usgs_measurements(&client, &station.station_id, metric, &start, &end, &policy).await {
                Ok(measurements) => stored += db.put_measurements(&measurements)?,
                Err(e) => {
                    warn!("Skipping {} {}: {}", station.station_id, metric, e);
                    failures += 1;
                }
            }
        }
    }
    info!("USGS fetch complete: {} measurements stored, {} requests failed", stored, failures);
    Ok(())
}

/// Fetch hourly observations for every NOAA station, one request per
/// station per day.
pub async fn run_fetch_weather(
    db: &Database,
    start: Option<&str>,
    end: Option<&str>,
    api_key: &str,
    base_url: &str,
    max_tries: u32,
) -> anyhow::Result<()> {
    let (start, end) = resolve_days(start, end, Utc::now().date_naive())?;
    let stations = db.get_all_stations(Some(Source::Noaa))?;
    let client = http_client()?;
    let policy = RetryPolicy {
        max_tries,
        ..RetryPolicy::default()
    };

    info!("Fetching weather for {} stations from {} to {}", stations.len(), start, end);

    let mut stored = 0usize;
    let mut failures = 0usize;
    for station in &stations {
        for day in DayRange::inclusive(start, end) {
            match fetch_hourly_observations(&client, base_url, api_key, station, &day, &policy).await {
                Ok(measurements) => stored += db.put_measurements(&measurements)?,
                Err(e) => {
                    warn!("Skipping {} on {}: {}", station.station_id, day, e);
                    failures += 1;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(WEATHER_REQUEST_SPACING_MS)).await;
        }
    }
    info!("Weather fetch complete: {} measurements stored, {} requests failed", stored, failures);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_default_to_yesterday() {
        let today = NaiveDate::from_ymd_opt(2018, 5, 2).unwrap();
        let (start, end) = resolve_days(None, None, today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2018, 5, 1).unwrap());
        assert_eq!(start, end);
    }

    #[test]
    fn test_explicit_days() {
        let today = NaiveDate::from_ymd_opt(2018, 5, 2).unwrap();
        let (start, end) = resolve_days(Some("2018-04-01"), Some("2018-04-03"), today).unwrap();
        assert_eq!(DayRange::inclusive(start, end).count(), 3);
        assert!(resolve_days(Some("2018-04-03"), Some("2018-04-01"), today).is_err());
        assert!(resolve_days(Some("April 1"), None, today).is_err());
    }

    #[tokio::test]
    async fn test_fetch_with_no_stations_is_a_no_op() {
        let db = Database::new().unwrap();
        run_fetch_usgs(&db, Some("2018-05-01"), Some("2018-05-01"), 1).await.unwrap();
        assert_eq!(db.count_measurements().unwrap(), 0);
    }
}
