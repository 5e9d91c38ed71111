//! Bulk CSV loading.

use log::info;
use rr_db::Database;
use std::path::Path;

/// Load whichever CSV files were given, catalogue first.
pub fn run_load(
    db: &Database,
    stations: Option<&Path>,
    runs: Option<&Path>,
    distances: Option<&Path>,
    measurements: Option<&Path>,
) -> anyhow::Result<()> {
    if stations.is_none() && runs.is_none() && distances.is_none() && measurements.is_none() {
        anyhow::bail!("nothing to load: pass at least one of --stations, --runs, --distances, --measurements");
    }

    if let Some(path) = stations {
        let n = db.load_stations(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} stations from {}", n, path.display());
    }
    if let Some(path) = runs {
        let n = db.load_runs(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} runs from {}", n, path.display());
    }
    if let Some(path) = distances {
        let n = db.load_station_distances(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} station distances from {}", n, path.display());
    }
    if let Some(path) = measurements {
        let n = db.load_measurements(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} measurements from {}", n, path.display());
    }
    Ok(())
}
