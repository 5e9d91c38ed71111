/// Error types for the RiverRunner core library
use thiserror::Error;

/// Main error type for store lookups and API ingestion
#[derive(Error, Debug)]
pub enum RiverError {
    /// No river run exists with the requested id
    #[error("run_id does not exist: {0}")]
    UnknownRun(i64),

    /// A measurement query was given an impossible date range
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    /// An identifier did not match any known metric code
    #[error("unknown metric id: {0}")]
    UnknownMetric(String),

    /// An identifier did not match any known station source
    #[error("unknown station source: {0}")]
    UnknownSource(String),

    /// A response body could not be decoded
    #[error("failed to parse response: {0}")]
    ResponseParse(#[from] serde_json::Error),

    /// A timestamp or value inside an otherwise valid response was malformed
    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    /// HTTP request failed
    #[cfg(feature = "api")]
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Every attempt of a bounded retry loop failed
    #[error("all {attempts} attempts failed for {target}")]
    RetriesExhausted { target: String, attempts: u32 },
}

/// Type alias for Results using RiverError
pub type Result<T> = std::result::Result<T, RiverError>;
