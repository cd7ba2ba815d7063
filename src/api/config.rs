//! Client configuration: defaults, an optional JSON config file and environment
//! variable overrides, applied in that order.

use crate::api::error::FarmDataError;
use crate::utils::{available_concurrency, get_config_path};
use bon::Builder;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str =
    "https://www.smartfarmkorea.net/Agree_WS/webservices/CropseasonRestService";
pub const DEFAULT_CACHE_CAPACITY: usize = 64;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_SERVICE_KEY: &str = "FARM_DATA_SERVICE_KEY";
pub const ENV_BASE_URL: &str = "FARM_DATA_BASE_URL";
pub const ENV_MAX_CONCURRENCY: &str = "FARM_DATA_MAX_CONCURRENCY";
pub const ENV_CACHE_CAPACITY: &str = "FARM_DATA_CACHE_CAPACITY";

/// Settings for [`crate::FarmDataClient`] and the fetch pipeline.
///
/// # Examples
///
/// ```
/// use farm_env_viz::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .service_key("my-key")
///     .max_concurrency(8)
///     .build();
/// assert_eq!(config.max_concurrency, 8);
/// assert_eq!(config.cache_capacity, farm_env_viz::DEFAULT_CACHE_CAPACITY);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the crop-season REST service, without trailing slash.
    #[builder(default = DEFAULT_BASE_URL.to_string(), into)]
    pub base_url: String,
    /// Data-mart service key, embedded in every request path.
    #[builder(into)]
    pub service_key: Option<String>,
    /// Maximum requests in flight per fan-out (pages of a season, or seasons).
    #[builder(default = available_concurrency())]
    pub max_concurrency: usize,
    /// Number of seasons kept in the in-memory cache.
    #[builder(default = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,
    /// Per-request timeout in seconds; `0` disables it.
    #[builder(default = DEFAULT_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::builder().build()
    }
}

impl ClientConfig {
    /// Loads the configuration.
    ///
    /// With `path`, that file must exist. Without it, the default config file
    /// (`<config dir>/farm_env_viz/config.json`) is read when present. Environment
    /// variables override whatever the file says.
    pub fn load(path: Option<&Path>) -> Result<Self, FarmDataError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match get_config_path() {
                Some(default_path) if default_path.is_file() => Self::from_file(&default_path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    ClientConfig::default()
                }
            },
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, FarmDataError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FarmDataError::ConfigRead(path.to_path_buf(), e))?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| FarmDataError::ConfigParse(path.to_path_buf(), e))?;
        info!("Loaded client config from {}", path.display());
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FarmDataError> {
        if let Some(key) = lookup(ENV_SERVICE_KEY) {
            self.service_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = parse_positive(ENV_MAX_CONCURRENCY, value)?;
        }
        if let Some(value) = lookup(ENV_CACHE_CAPACITY) {
            self.cache_capacity = parse_positive(ENV_CACHE_CAPACITY, value)?;
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn parse_positive(name: &'static str, value: String) -> Result<usize, FarmDataError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FarmDataError::ConfigEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.service_key, None);
        assert!(config.max_concurrency >= 1);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"service_key": "abc", "cache_capacity": 3, "request_timeout_secs": 0}}"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service_key.as_deref(), Some("abc"));
        assert_eq!(config.cache_capacity, 3);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, FarmDataError::ConfigRead(..)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SERVICE_KEY, "from-env"),
            (ENV_MAX_CONCURRENCY, "3"),
        ]);
        let config = ClientConfig::default()
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.service_key.as_deref(), Some("from-env"));
        assert_eq!(config.max_concurrency, 3);

        let err = ClientConfig::default()
            .with_env_overrides(|name| (name == ENV_CACHE_CAPACITY).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            FarmDataError::ConfigEnv {
                name: ENV_CACHE_CAPACITY,
                ..
            }
        ));
    }
}
