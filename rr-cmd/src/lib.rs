//! Command implementations for the RiverRunner CLI.
//!
//! Every command opens the SQLite database given by `--db`, so the same
//! file carries the catalogue, raw measurements and predictions between
//! invocations.

use clap::Subcommand;
use rr_db::Database;
use std::path::{Path, PathBuf};

pub mod fetch;
pub mod forecast;
pub mod load;

#[derive(Subcommand)]
pub enum Command {
    /// Create the database schema
    Init,

    /// Load CSV files into the database
    Load {
        /// Stations CSV: station_id,source,name,latitude,longitude
        #[arg(long)]
        stations: Option<PathBuf>,

        /// River runs CSV
        #[arg(long)]
        runs: Option<PathBuf>,

        /// Station to put-in distances CSV: station_id,run_id,distance
        #[arg(long)]
        distances: Option<PathBuf>,

        /// Measurements CSV: station_id,metric_id,date_time,value
        #[arg(short = 'm', long)]
        measurements: Option<PathBuf>,
    },

    /// Fetch USGS instantaneous values for every USGS station
    FetchUsgs {
        /// First day to fetch (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        start: Option<String>,

        /// Last day to fetch (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        end: Option<String>,

        /// Attempts per request before giving up on it
        #[arg(long, default_value_t = 3)]
        max_tries: u32,
    },

    /// Fetch hourly weather observations for every NOAA station
    FetchWeather {
        /// First day to fetch (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        start: Option<String>,

        /// Last day to fetch (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        end: Option<String>,

        /// Weather service API key
        #[arg(long, env = "DARK_SKY_KEY", hide_env_values = true)]
        api_key: String,

        /// Weather service base URL
        #[arg(long, default_value = rr_core::weather::WEATHER_BASE_URL)]
        base_url: String,

        /// Attempts per request before giving up on it
        #[arg(long, default_value_t = 3)]
        max_tries: u32,
    },

    /// Forecast flow for every run and store the predictions
    Forecast {
        /// Only forecast this run
        #[arg(short = 'r', long)]
        run: Option<i64>,

        /// TOML file overriding forecast settings
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },

    /// Print today's runability score for every run
    Runability {
        /// Score this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(db_path: &Path, command: Command) -> anyhow::Result<()> {
    let db = Database::open(db_path)?;
    match command {
        Command::Init => {
            log::info!("Schema ready in {}", db_path.display());
            Ok(())
        }
        Command::Load {
            stations,
            runs,
            distances,
            measurements,
        } => load::run_load(
            &db,
            stations.as_deref(),
            runs.as_deref(),
            distances.as_deref(),
            measurements.as_deref(),
        ),
        Command::FetchUsgs { start, end, max_tries } => {
            fetch::run_fetch_usgs(&db, start.as_deref(), end.as_deref(), max_tries).await
        }
        Command::FetchWeather {
            start,
            end,
            api_key,
            base_url,
            max_tries,
        } => {
            fetch::run_fetch_weather(&db, start.as_deref(), end.as_deref(), &api_key, &base_url, max_tries).await
        }
        Command::Forecast { run, config } => forecast::run_forecast(&db, run, config.as_deref()).map(|_| ()),
        Command::Runability { date, json } => forecast::run_runability(&db, date.as_deref(), json),
    }
}
