//! FILENAME: core/grid-model/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Row not found: {0}")]
    UnknownRow(String),
}
