use crate::api::error::FarmDataError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvDataError {
    #[error(transparent)]
    Upstream(#[from] FarmDataError),

    #[error("Invalid timestamp '{value}' in readings for attribute {attribute}")]
    InvalidTimestamp { value: String, attribute: String },

    #[error("Non-numeric sensor value '{value}' for attribute {attribute} at {measured_at}")]
    InvalidSensorValue {
        value: String,
        attribute: String,
        measured_at: String,
    },

    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}

impl EnvDataError {
    /// Whether the error is one of the timestamp / value parse failures.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            EnvDataError::InvalidTimestamp { .. } | EnvDataError::InvalidSensorValue { .. }
        )
    }
}
