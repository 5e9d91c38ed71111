//! SQLite database layer for RiverRunner.
//!
//! This crate owns the relational schema and exposes typed CRUD methods for
//! stations, river runs, measurements and predictions. The forecast pipeline
//! talks to it only through the store traits in [`rr_core::store`], which
//! [`Database`] implements.
//!
//! # Architecture
//!
//! - `Rc<RefCell<Connection>>` wrapper: the batch job is single-threaded and
//!   clones of the handle share one connection
//! - File-backed SQLite for the CLI, in-memory for tests
//! - CSV loaders for the scraped station/run catalogue and bulk measurement
//!   files
//! - Every timestamp is stored as UTC text in
//!   [`DB_TIMESTAMP_FORMAT`](rr_utils::dates::DB_TIMESTAMP_FORMAT), so range
//!   filters are plain string comparisons
//!
//! # Usage
//!
//! ```rust
//! use rr_db::Database;
//!
//! let db = Database::new().unwrap();
//!
//! db.load_runs("run_id,run_name,river_name,class_rating,min_level,max_level,put_in_latitude,put_in_longitude,take_out_latitude,take_out_longitude,distance\n599,Gold Bar to Sultan,Skykomish,II,1000,8000,47.85,-121.69,47.86,-121.81,8.0\n").unwrap();
//! db.load_measurements("station_id,metric_id,date_time,value\n12134500,00060,2018-05-01 07:00:00,4350\n").unwrap();
//!
//! let runs = db.get_all_runs().unwrap();
//! assert_eq!(runs[0].run_name, "Gold Bar to Sultan");
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.
//!
//! - `metric` - Metric codes and units
//! - `station` - Weather and streamflow stations
//! - `river_run` - Runs and their recommended flow band
//! - `station_river_distance` - Station to put-in distances for proximity lookups
//! - `measurement` - Raw observations keyed by (station, metric, timestamp)
//! - `prediction` - Forecasts keyed by (run, day)

pub mod schema;
mod loader;
mod predictions;
mod queries;
mod store;

use rusqlite::Connection;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// SQLite database holding the RiverRunner schema.
///
/// This struct is cheaply cloneable (via `Rc`); clones share the same
/// connection.
///
/// # Example
///
/// ```rust
/// use rr_db::Database;
/// use rr_core::station::Source;
///
/// let db = Database::new().unwrap();
/// db.load_stations("station_id,source,name,latitude,longitude\n12134500,USGS,Skykomish near Gold Bar,47.837,-121.666\n").unwrap();
/// let stations = db.get_all_stations(Some(Source::Usgs)).unwrap();
/// assert_eq!(stations.len(), 1);
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Open (or create) a database file and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("[RR Debug] db: opened {}", path.as_ref().display());
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(schema::create_schema())?;
        conn.execute_batch(&schema::seed_metrics())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}
