//! Error types for the dashboard pipeline.
//!
//! Fetch and credential failures are fatal and abort the run. Geocoding
//! failures are per-address and end up as "not found".

use thiserror::Error;

/// Failure to obtain a usable roster. No partial data is ever returned.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to fetch roster from {location}: {cause}")]
    Request {
        location: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("roster request to {location} returned HTTP {status}")]
    Status { location: String, status: u16 },

    #[error("failed to read roster file {location}: {cause}")]
    Io {
        location: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("malformed roster data from {location}: {cause}")]
    Csv {
        location: String,
        #[source]
        cause: csv::Error,
    },

    #[error("roster from {location} is missing expected column \"{column}\"")]
    MissingColumn { location: String, column: String },
}

/// Reasons a single address could not be resolved. Callers see these only as
/// log lines; the geocoder reports them as "not found".
#[derive(Error, Debug)]
pub enum GeocodeError {
    // Built with the URL stripped: the query string carries the API key.
    #[error("geocoding request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("geocoding service returned HTTP {0}")]
    Status(u16),

    #[error("unexpected geocoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("geocoding service returned no results")]
    NoResults,
}

/// Top-level failure of a dashboard run.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("geocoding credential {0} is not set")]
    MissingCredential(&'static str),

    #[error("failed to write dashboard output: {0}")]
    Export(#[from] std::io::Error),

    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
