pub mod error;
pub mod measurement;
pub mod prediction;
pub mod retry;
pub mod river_run;
pub mod station;
pub mod store;
pub mod usgs;
pub mod weather;
