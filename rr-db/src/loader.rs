//! CSV loaders and bulk inserts for populating the database.
//!
//! Each loader parses CSV data from a string slice and upserts rows into the
//! corresponding table. Rows that cannot be parsed are counted and skipped
//! rather than failing the whole file.
//!
//! # CSV Formats
//!
//! All files have headers.
//!
//! - **Stations**: `station_id,source,name,latitude,longitude`
//! - **Runs**: `run_id,run_name,river_name,class_rating,min_level,max_level,put_in_latitude,put_in_longitude,take_out_latitude,take_out_longitude,distance`
//! - **Station distances**: `station_id,run_id,distance`
//! - **Measurements**: `station_id,metric_id,date_time,value`

use crate::Database;
use rr_core::{measurement::Measurement, measurement::Metric, station::Source};
use rr_utils::dates::{format_timestamp, parse_timestamp};
use rusqlite::params;

fn optional_f64(field: Option<&str>) -> Option<f64> {
    field.and_then(|s| s.trim().parse().ok())
}

fn optional_text(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

fn reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes())
}

impl Database {
    /// Load station metadata from CSV string.
    ///
    /// Rows with an unknown source or unparseable coordinates are skipped.
    ///
    /// # Example CSV
    /// ```text
    /// station_id,source,name,latitude,longitude
    /// 12134500,USGS,Skykomish River near Gold Bar,47.837,-121.666
    /// KSEA,NOAA,Seattle-Tacoma International Airport,47.444,-122.314
    /// ```
    pub fn load_stations(&self, csv_data: &str) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);

        let mut count = 0usize;
        let mut skipped = 0u32;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(0).unwrap_or("").trim();
            let source = r.get(1).unwrap_or("").parse::<Source>();
            let name = r.get(2).unwrap_or("").trim();
            let latitude = optional_f64(r.get(3));
            let longitude = optional_f64(r.get(4));

            let (Ok(source), Some(latitude), Some(longitude)) = (source, latitude, longitude) else {
                skipped += 1;
                continue;
            };
            if station_id.is_empty() {
                skipped += 1;
                continue;
            }

            conn.execute(
                "INSERT OR REPLACE INTO station (station_id, source, name, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![station_id, source.as_str(), name, latitude, longitude],
            )?;
            count += 1;
        }
        log::info!("[RR Debug] loader: Loaded {} stations, skipped {} invalid", count, skipped);
        Ok(count)
    }

    /// Load the river run catalogue from CSV string.
    ///
    /// `class_rating`, the flow band, take-out coordinates and distance may be
    /// empty and are stored as NULL. Rows without a numeric id or put-in are
    /// skipped.
    ///
    /// # Example CSV
    /// ```text
    /// run_id,run_name,river_name,class_rating,min_level,max_level,put_in_latitude,put_in_longitude,take_out_latitude,take_out_longitude,distance
    /// 599,Gold Bar to Sultan,Skykomish,II,1000,8000,47.85,-121.69,47.86,-121.81,8.0
    /// ```
    pub fn load_runs(&self, csv_data: &str) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);

        let mut count = 0usize;
        let mut skipped = 0u32;
        for result in rdr.records() {
            let r = result?;
            let run_id: Option<i64> = r.get(0).and_then(|s| s.trim().parse().ok());
            let put_in_latitude = optional_f64(r.get(6));
            let put_in_longitude = optional_f64(r.get(7));
            let (Some(run_id), Some(put_in_latitude), Some(put_in_longitude)) =
                (run_id, put_in_latitude, put_in_longitude)
            else {
                skipped += 1;
                continue;
            };

            conn.execute(
                "INSERT OR REPLACE INTO river_run
                 (run_id, run_name, river_name, class_rating, min_level, max_level,
                  put_in_latitude, put_in_longitude, take_out_latitude, take_out_longitude, distance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    run_id,
                    r.get(1).unwrap_or("").trim(),
                    r.get(2).unwrap_or("").trim(),
                    optional_text(r.get(3)),
                    optional_f64(r.get(4)),
                    optional_f64(r.get(5)),
                    put_in_latitude,
                    put_in_longitude,
                    optional_f64(r.get(8)),
                    optional_f64(r.get(9)),
                    optional_f64(r.get(10)),
                ],
            )?;
            count += 1;
        }
        log::info!("[RR Debug] loader: Loaded {} runs, skipped {} invalid", count, skipped);
        Ok(count)
    }

    /// Load precomputed station to put-in distances from CSV string.
    ///
    /// # Example CSV
    /// ```text
    /// station_id,run_id,distance
    /// 12134500,599,2.4
    /// ```
    pub fn load_station_distances(&self, csv_data: &str) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);

        let mut count = 0usize;
        let mut skipped = 0u32;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(0).unwrap_or("").trim();
            let run_id: Option<i64> = r.get(1).and_then(|s| s.trim().parse().ok());
            let distance = optional_f64(r.get(2)).filter(|d| d.is_finite() && *d >= 0.0);
            let (Some(run_id), Some(distance)) = (run_id, distance) else {
                skipped += 1;
                continue;
            };
            if station_id.is_empty() {
                skipped += 1;
                continue;
            }

            conn.execute(
                "INSERT OR REPLACE INTO station_river_distance (station_id, run_id, distance)
                 VALUES (?1, ?2, ?3)",
                params![station_id, run_id, distance],
            )?;
            count += 1;
        }
        log::info!(
            "[RR Debug] loader: Loaded {} station distances, skipped {} invalid",
            count,
            skipped
        );
        Ok(count)
    }

    /// Load measurements from CSV string.
    ///
    /// Timestamps may be in any form accepted by
    /// [`parse_timestamp`](rr_utils::dates::parse_timestamp) and are
    /// normalized to UTC. Rows with an unknown metric code, a bad timestamp
    /// or a non-numeric value are skipped.
    ///
    /// # Example CSV
    /// ```text
    /// station_id,metric_id,date_time,value
    /// 12134500,00060,2018-05-01T00:00:00-07:00,4350
    /// KSEA,00001,2018-05-01 07:00:00,51.3
    /// ```
    pub fn load_measurements(&self, csv_data: &str) -> anyhow::Result<usize> {
        let mut rdr = reader(csv_data);

        let mut rows = Vec::new();
        let mut skipped = 0u32;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(0).unwrap_or("").trim();
            let metric = r.get(1).unwrap_or("").parse::<Metric>();
            let timestamp = parse_timestamp(r.get(2).unwrap_or(""));
            let value = optional_f64(r.get(3)).filter(|v| v.is_finite());

            match (metric, timestamp, value) {
                (Ok(metric), Ok(timestamp), Some(value)) if !station_id.is_empty() => {
                    rows.push(Measurement::new(station_id, metric, timestamp, value));
                }
                _ => skipped += 1,
            }
        }
        let count = self.put_measurements(&rows)?;
        log::info!("[RR Debug] loader: Loaded {} measurements, skipped {} invalid", count, skipped);
        Ok(count)
    }

    /// Upsert measurements in a single transaction.
    ///
    /// A re-fetched reading for the same (station, metric, timestamp)
    /// replaces the stored value.
    pub fn put_measurements(&self, measurements: &[Measurement]) -> anyhow::Result<usize> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO measurement (station_id, metric_id, date_time, value)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for m in measurements {
                stmt.execute(params![
                    m.station_id,
                    m.metric.id(),
                    format_timestamp(&m.timestamp),
                    m.value
                ])?;
            }
        }
        tx.commit()?;
        Ok(measurements.len())
    }
}
