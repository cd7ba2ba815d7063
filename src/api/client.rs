//! HTTP implementation of [`FarmDataSource`] for the Smart Farm data-mart REST API.

use crate::api::config::ClientConfig;
use crate::api::error::FarmDataError;
use crate::api::source::FarmDataSource;
use crate::types::env_reading::{EnvPage, EnvRow};
use crate::types::season::SeasonRecord;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Data-mart client backed by `reqwest`.
///
/// Construct one explicitly and hand it to [`crate::FarmEnv::new`]; the client is
/// cheap to clone and shares its connection pool between clones.
///
/// # Examples
///
/// ```no_run
/// use farm_env_viz::{ClientConfig, FarmDataClient, FarmEnv};
///
/// # async fn run() -> Result<(), farm_env_viz::FarmEnvError> {
/// let config = ClientConfig::load(None)?;
/// let client = FarmDataClient::new(&config)?;
/// let farm_env = FarmEnv::new(client, &config);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FarmDataClient {
    http: Client,
    base_url: String,
    service_key: String,
}

impl FarmDataClient {
    pub fn new(config: &ClientConfig) -> Result<Self, FarmDataError> {
        let service_key = config
            .service_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(FarmDataError::MissingServiceKey)?;

        let mut builder = Client::builder().gzip(true);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(FarmDataError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn seasons_url(&self, year: i32) -> String {
        format!(
            "{}/getCroppingSeasonDataList/{}/{}",
            self.base_url, self.service_key, year
        )
    }

    fn env_url(&self, season_id: i64, page: u32) -> String {
        format!(
            "{}/getCroppingSeasonEnvDataList/{}/{}/{}",
            self.base_url, self.service_key, season_id, page
        )
    }

    /// The URL with the service key masked, for logs and error messages.
    fn redact(&self, url: &str) -> String {
        url.replace(&self.service_key, "***")
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FarmDataError> {
        let shown = self.redact(url);
        debug!("GET {}", shown);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FarmDataError::NetworkRequest(shown.clone(), e.without_url()))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", shown, e.status());
                return Err(if let Some(status) = e.status() {
                    FarmDataError::HttpStatus {
                        url: shown,
                        status,
                        source: e.without_url(),
                    }
                } else {
                    FarmDataError::NetworkRequest(shown, e.without_url())
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| FarmDataError::NetworkRequest(shown.clone(), e.without_url()))?;
        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            FarmDataError::JsonDecode {
                url: shown.clone(),
                source: e,
            }
        })?;

        if let Some(fault) = service_fault(&value) {
            let (code, message) = fault;
            warn!("Data-mart error {} for {}: {}", code, shown, message);
            return Err(FarmDataError::Service {
                url: shown,
                code,
                message,
            });
        }

        serde_json::from_value(value).map_err(|e| FarmDataError::JsonDecode {
            url: shown,
            source: e,
        })
    }
}

/// The service reports failures as an object carrying `resultCode` / `resultMsg`
/// instead of the usual row array.
fn service_fault(value: &Value) -> Option<(String, String)> {
    let object = value.as_object()?;
    let code = object.get("resultCode")?;
    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let message = object
        .get("resultMsg")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some((code, message))
}

impl FarmDataSource for FarmDataClient {
    async fn list_seasons(&self, year: i32) -> Result<Vec<SeasonRecord>, FarmDataError> {
        self.get_json(&self.seasons_url(year)).await
    }

    async fn list_env_readings(
        &self,
        season_id: i64,
        page: u32,
    ) -> Result<EnvPage, FarmDataError> {
        let rows: Vec<EnvRow> = self.get_json(&self.env_url(season_id, page)).await?;
        EnvPage::from_rows(season_id, rows)
    }
}
