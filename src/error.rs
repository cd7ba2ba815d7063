use crate::api::error::FarmDataError;
use crate::env_data::error::EnvDataError;
use crate::visualize::error::VisualizeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FarmEnvError {
    #[error(transparent)]
    Upstream(#[from] FarmDataError),

    #[error(transparent)]
    EnvData(#[from] EnvDataError),

    #[error(transparent)]
    Visualize(#[from] VisualizeError),

    #[error("No crop seasons match {selection} for years {years:?}")]
    EmptySelection { years: Vec<i32>, selection: String },
}

impl FarmEnvError {
    /// Whether the data-mart (or the connection to it) caused the failure.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            FarmEnvError::Upstream(_) | FarmEnvError::EnvData(EnvDataError::Upstream(_))
        )
    }

    /// Whether a timestamp or sensor value could not be parsed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, FarmEnvError::EnvData(e) if e.is_parse_error())
    }
}
