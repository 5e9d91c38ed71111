//! Typed query methods for the run catalogue, stations and measurements.
//!
//! # Station selection
//!
//! Measurements for a run come from the stations ranked by distance to its
//! put-in (`station_river_distance`). Which of those stations are used is
//! decided by [`select_stations`]; this module only ranks and filters.

use crate::Database;
use chrono::{DateTime, Utc};
use rr_core::{
    error::RiverError,
    measurement::{Measurement, Metric},
    river_run::RiverRun,
    station::{select_stations, Source, Station, StationDistance},
};
use rr_utils::dates::{format_timestamp, parse_timestamp};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const RUN_COLUMNS: &str = "run_id, run_name, river_name, class_rating, min_level, max_level,
     put_in_latitude, put_in_longitude, take_out_latitude, take_out_longitude, distance";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RiverRun> {
    Ok(RiverRun {
        run_id: row.get(0)?,
        run_name: row.get(1)?,
        river_name: row.get(2)?,
        class_rating: row.get(3)?,
        min_level: row.get(4)?,
        max_level: row.get(5)?,
        put_in_latitude: row.get(6)?,
        put_in_longitude: row.get(7)?,
        take_out_latitude: row.get(8)?,
        take_out_longitude: row.get(9)?,
        distance: row.get(10)?,
    })
}

impl Database {
    // ───────────────────── Catalogue Queries ─────────────────────

    /// All river runs, ordered by id.
    pub fn get_all_runs(&self) -> anyhow::Result<Vec<RiverRun>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM river_run ORDER BY run_id", RUN_COLUMNS))?;
        let rows = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("[RR Debug] query: get_all_runs returned {} records", rows.len());
        Ok(rows)
    }

    /// One river run. Fails with [`RiverError::UnknownRun`] if absent.
    pub fn get_run(&self, run_id: i64) -> anyhow::Result<RiverRun> {
        let conn = self.conn.borrow();
        let run = conn
            .query_row(
                &format!("SELECT {} FROM river_run WHERE run_id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?;
        run.ok_or_else(|| RiverError::UnknownRun(run_id).into())
    }

    /// All stations, optionally restricted to one source network.
    pub fn get_all_stations(&self, source: Option<Source>) -> anyhow::Result<Vec<Station>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT station_id, source, name, latitude, longitude FROM station
             WHERE ?1 IS NULL OR source = ?1
             ORDER BY station_id",
        )?;
        let raw = stmt
            .query_map(params![source.map(|s| s.as_str())], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stations = Vec::with_capacity(raw.len());
        for (station_id, source, name, latitude, longitude) in raw {
            stations.push(Station {
                station_id,
                source: source.parse()?,
                name,
                latitude,
                longitude,
            });
        }
        log::info!("[RR Debug] query: get_all_stations returned {} records", stations.len());
        Ok(stations)
    }

    /// Stations with a known distance to the run's put-in, nearest first.
    pub fn get_ranked_stations(&self, run_id: i64) -> anyhow::Result<Vec<StationDistance>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT d.station_id, d.run_id, s.source, d.distance
             FROM station_river_distance d
             INNER JOIN station s ON s.station_id = d.station_id
             WHERE d.run_id = ?1
             ORDER BY d.distance, d.station_id",
        )?;
        let raw = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut ranked = Vec::with_capacity(raw.len());
        for (station_id, run_id, source, distance) in raw {
            ranked.push(StationDistance {
                station_id,
                run_id,
                source: source.parse()?,
                distance,
            });
        }
        Ok(ranked)
    }

    // ───────────────────── Measurement Queries ─────────────────────

    /// Measurements in `[start, end)` from the stations selected for a run,
    /// checked against the clock reading `now`.
    ///
    /// Fails with [`RiverError::UnknownRun`] for an unknown run and with
    /// [`RiverError::InvalidDateRange`] when `start` is in the future or
    /// `end` precedes `start`. Results are ordered by timestamp, then
    /// station, then metric.
    pub fn get_measurements_at(
        &self,
        run_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_distance: Option<f64>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Measurement>> {
        self.get_run(run_id)?;
        if start > now {
            return Err(RiverError::InvalidDateRange(format!(
                "start {} is after the current time {}",
                format_timestamp(&start),
                format_timestamp(&now)
            ))
            .into());
        }
        if end < start {
            return Err(RiverError::InvalidDateRange(format!(
                "end {} is before start {}",
                format_timestamp(&end),
                format_timestamp(&start)
            ))
            .into());
        }

        let stations = select_stations(&self.get_ranked_stations(run_id)?, min_distance);
        if stations.is_empty() {
            log::warn!("[RR Debug] query: run {} has no nearby stations", run_id);
            return Ok(Vec::new());
        }

        let placeholders = (0..stations.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT station_id, metric_id, date_time, value FROM measurement
             WHERE date_time >= ?1 AND date_time < ?2 AND station_id IN ({})
             ORDER BY date_time, station_id, metric_id",
            placeholders
        );
        let mut bind = vec![format_timestamp(&start), format_timestamp(&end)];
        bind.extend(stations);

        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut measurements = Vec::with_capacity(raw.len());
        for (station_id, metric_id, date_time, value) in raw {
            let metric: Metric = metric_id.parse()?;
            measurements.push(Measurement::new(
                &station_id,
                metric,
                parse_timestamp(&date_time)?,
                value,
            ));
        }
        log::info!(
            "[RR Debug] query: get_measurements for run {} returned {} records",
            run_id,
            measurements.len()
        );
        Ok(measurements)
    }

    /// Total number of stored measurements.
    pub fn count_measurements(&self) -> anyhow::Result<i64> {
        let conn = self.conn.borrow();
        let count = conn.query_row("SELECT COUNT(*) FROM measurement", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::{Duration, TimeZone, Utc};
    use rr_core::{error::RiverError, measurement::Metric, station::Source};

    const RUNS: &str = "\
run_id,run_name,river_name,class_rating,min_level,max_level,put_in_latitude,put_in_longitude,take_out_latitude,take_out_longitude,distance
599,Gold Bar to Sultan,Skykomish,II,1000,8000,47.85,-121.69,47.86,-121.81,8.0
";

    const STATIONS: &str = "\
station_id,source,name,latitude,longitude
12134500,USGS,Skykomish River near Gold Bar,47.837,-121.666
12150800,USGS,Snohomish River near Monroe,47.83,-122.04
KSEA,NOAA,Seattle-Tacoma International Airport,47.444,-122.314
";

    const DISTANCES: &str = "\
station_id,run_id,distance
12134500,599,1.2
KSEA,599,30.5
12150800,599,12.0
";

    const MEASUREMENTS: &str = "\
station_id,metric_id,date_time,value
12134500,00060,2018-05-01 07:00:00,4350
KSEA,00001,2018-05-01 07:00:00,51.3
KSEA,00003,2018-05-01 07:00:00,0.01
12150800,00060,2018-05-01 07:00:00,9000
12134500,00060,2018-05-02 07:00:00,4400
12134500,00060,2018-05-03 00:00:00,4500
";

    fn seeded() -> Database {
        let db = Database::new().unwrap();
        db.load_runs(RUNS).unwrap();
        db.load_stations(STATIONS).unwrap();
        db.load_station_distances(DISTANCES).unwrap();
        db.load_measurements(MEASUREMENTS).unwrap();
        db
    }

    #[test]
    fn get_run_unknown_id() {
        let db = seeded();
        let err = db.get_run(42).unwrap_err();
        assert!(matches!(err.downcast_ref::<RiverError>(), Some(RiverError::UnknownRun(42))));
        assert_eq!(db.get_run(599).unwrap().flow_band(), Some((1000.0, 8000.0)));
    }

    #[test]
    fn get_all_stations_filters_by_source() {
        let db = seeded();
        assert_eq!(db.get_all_stations(None).unwrap().len(), 3);
        let noaa = db.get_all_stations(Some(Source::Noaa)).unwrap();
        assert_eq!(noaa.len(), 1);
        assert_eq!(noaa[0].station_id, "KSEA");
    }

    #[test]
    fn ranked_stations_are_nearest_first() {
        let db = seeded();
        let ranked = db.get_ranked_stations(599).unwrap();
        let ids: Vec<_> = ranked.iter().map(|s| s.station_id.as_str()).collect();
        assert_eq!(ids, vec!["12134500", "12150800", "KSEA"]);
    }

    #[test]
    fn measurements_use_nearest_station_per_source() {
        let db = seeded();
        let start = Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2018, 5, 3, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let rows = db.get_measurements_at(599, start, end, None, now).unwrap();

        assert_eq!(rows.len(), 4, "end is exclusive and the farther USGS gauge is ignored");
        assert!(rows.iter().all(|m| m.station_id != "12150800"));
        assert!(rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(rows.iter().any(|m| m.metric == Metric::Temperature));
    }

    #[test]
    fn measurements_within_radius() {
        let db = seeded();
        let start = Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(1);
        let now = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let rows = db.get_measurements_at(599, start, end, Some(15.0), now).unwrap();
        let mut ids: Vec<_> = rows.iter().map(|m| m.station_id.clone()).collect();
        ids.dedup();
        assert_eq!(ids, vec!["12134500", "12150800"]);
    }

    #[test]
    fn measurements_reject_bad_ranges() {
        let db = seeded();
        let now = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();

        let future = now + Duration::days(1);
        let err = db.get_measurements_at(599, future, future + Duration::days(1), None, now).unwrap_err();
        assert!(matches!(err.downcast_ref::<RiverError>(), Some(RiverError::InvalidDateRange(_))));

        let start = now - Duration::days(2);
        let err = db.get_measurements_at(599, start, start - Duration::days(1), None, now).unwrap_err();
        assert!(matches!(err.downcast_ref::<RiverError>(), Some(RiverError::InvalidDateRange(_))));

        let err = db.get_measurements_at(7, start, now, None, now).unwrap_err();
        assert!(matches!(err.downcast_ref::<RiverError>(), Some(RiverError::UnknownRun(7))));
    }

    #[test]
    fn measurements_without_stations_are_empty() {
        let db = Database::new().unwrap();
        db.load_runs(RUNS).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let rows = db.get_measurements_at(599, now - Duration::days(10), now, None, now).unwrap();
        assert!(rows.is_empty());
    }
}
