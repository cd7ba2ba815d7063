use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the Smart Farm data-mart, or configuring the client that does.
#[derive(Debug, Error)]
pub enum FarmDataError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode JSON response from {url}")]
    JsonDecode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Data-mart returned error {code} for {url}: {message}")]
    Service {
        url: String,
        code: String,
        message: String,
    },

    #[error("Invalid page count '{value}' reported for season {season_id}")]
    InvalidPagination { season_id: i64, value: String },

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("No data-mart service key configured (set FARM_DATA_SERVICE_KEY or `service_key` in the config file)")]
    MissingServiceKey,

    #[error("Failed to read config file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),

    #[error("Invalid value '{value}' for environment variable {name}")]
    ConfigEnv { name: &'static str, value: String },
}
