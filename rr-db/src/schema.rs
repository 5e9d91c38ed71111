//! SQL schema definitions for the RiverRunner SQLite database.
//!
//! The schema is applied as a single batch whenever a [`Database`](crate::Database)
//! is opened, so every statement must be idempotent.

use rr_core::measurement::Metric;

/// Returns the full SQL schema as a single batch string.
///
/// This creates the following tables:
///
/// **Catalogue tables:**
/// - `metric` - Metric code, name, description and units
/// - `station` - Station id, source network, name, lat/lon
/// - `river_run` - Run id, names, class rating, flow band, put-in/take-out coordinates
/// - `station_river_distance` - Distance in miles from each station to each run's put-in
///
/// **Time series tables:**
/// - `measurement` - One value per (station, metric, UTC timestamp)
/// - `prediction` - One forecast row per (run, day) with 95% interval bounds
///
/// Timestamps are stored as `YYYY-MM-DD HH:MM:SS` UTC text.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS metric (
        metric_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        units TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS station (
        station_id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        name TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS river_run (
        run_id INTEGER PRIMARY KEY,
        run_name TEXT NOT NULL,
        river_name TEXT NOT NULL,
        class_rating TEXT,
        min_level REAL,
        max_level REAL,
        put_in_latitude REAL NOT NULL,
        put_in_longitude REAL NOT NULL,
        take_out_latitude REAL,
        take_out_longitude REAL,
        distance REAL
    );

    CREATE TABLE IF NOT EXISTS station_river_distance (
        station_id TEXT NOT NULL,
        run_id INTEGER NOT NULL,
        distance REAL NOT NULL,
        PRIMARY KEY (station_id, run_id)
    );
    CREATE INDEX IF NOT EXISTS idx_srd_run ON station_river_distance(run_id);

    CREATE TABLE IF NOT EXISTS measurement (
        station_id TEXT NOT NULL,
        metric_id TEXT NOT NULL,
        date_time TEXT NOT NULL,
        value REAL NOT NULL,
        PRIMARY KEY (station_id, metric_id, date_time)
    );
    CREATE INDEX IF NOT EXISTS idx_measurement_station ON measurement(station_id);
    CREATE INDEX IF NOT EXISTS idx_measurement_date_time ON measurement(date_time);

    CREATE TABLE IF NOT EXISTS prediction (
        run_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        fr_lb REAL NOT NULL,
        fr REAL NOT NULL,
        fr_ub REAL NOT NULL,
        PRIMARY KEY (run_id, timestamp)
    );
    "#
}

/// Returns `INSERT OR IGNORE` statements for every known [`Metric`].
pub fn seed_metrics() -> String {
    Metric::ALL
        .iter()
        .map(|m| {
            format!(
                "INSERT OR IGNORE INTO metric (metric_id, name, description, units) VALUES ('{}', '{}', '{}', '{}');",
                m.id(),
                m.name(),
                m.name(),
                m.units()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
