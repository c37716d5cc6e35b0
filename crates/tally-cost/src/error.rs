//! Error types for the cost engine.
//!
//! Filtering, sorting and aggregation are infallible. Errors only arise at
//! the edges: decoding record payloads, reading record files and turning a
//! [`tally_core::TallyConfig`] into engine settings.

use std::path::PathBuf;

use thiserror::Error;

/// Why a record payload was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The payload is neither an array nor an object with a `records` array
    #[error("expected an array of records, found {found}")]
    NotAnArray { found: &'static str },

    /// An array element is not a JSON object
    #[error("record {index}: expected an object, found {found}")]
    NotAnObject { index: usize, found: &'static str },

    /// A record has no usable `id`
    #[error("record {index}: missing or empty id")]
    MissingId { index: usize },

    /// A record field has the wrong type
    #[error("record {index}: {message}")]
    InvalidField { index: usize, message: String },
}

impl ValidationError {
    /// Index of the offending record, when the error concerns one record.
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::NotAnArray { .. } => None,
            ValidationError::NotAnObject { index, .. }
            | ValidationError::MissingId { index }
            | ValidationError::InvalidField { index, .. } => Some(*index),
        }
    }
}

/// Cost engine errors.
#[derive(Error, Debug)]
pub enum CostError {
    /// Record payload failed validation
    #[error("invalid record payload: {0}")]
    Validation(#[from] ValidationError),

    /// JSON syntax error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file reading)
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be turned into engine settings
    #[error("configuration error: {0}")]
    Config(String),
}

impl CostError {
    /// Create a user-friendly message for this error.
    pub fn friendly_message(&self) -> String {
        match self {
            CostError::Io { path, source } => match source.kind() {
                std::io::ErrorKind::NotFound => {
                    format!("Record file not found: {}", path.display())
                }
                std::io::ErrorKind::PermissionDenied => {
                    format!("Permission denied reading {}", path.display())
                }
                _ => format!("File system error: {}", source),
            },
            CostError::Validation(e) => format!("The record file is not in the expected shape: {e}"),
            _ => format!("Error: {}", self),
        }
    }
}

/// Result type for cost engine operations.
pub type Result<T> = std::result::Result<T, CostError>;
