use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisualizeError {
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Column '{0}' has no values to plot")]
    NoValues(String),

    #[error("Grid of {rows}x{columns} panels is not supported (1 to {max} panels per page)")]
    InvalidGrid {
        rows: usize,
        columns: usize,
        max: usize,
    },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
