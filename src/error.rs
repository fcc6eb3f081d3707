//! Error types for stacking runs.
//!
//! Every error is fatal for the run that raised it: a caller receives either the
//! complete list of stacks or exactly one `Error`.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration: unknown criterion key, unknown operator, empty
    /// operator nodes, a `NOT` with the wrong child count, an empty criteria list.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The criteria value is not valid JSON or does not fit any accepted shape.
    #[error("Invalid criteria JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A regex pattern failed to compile during the precompile pass.
    #[error("Invalid regex pattern '{pattern}' for criterion '{key}': {source}")]
    InvalidPattern {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A capture index or split index does not exist for some asset's value.
    #[error("Extraction error for asset '{asset_id}' on criterion '{key}': {reason}")]
    ExtractionRange { asset_id: String, key: String, reason: String },
}

impl Error {
    /// Whether this error stems from the configuration rather than asset data.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Json(_) | Error::InvalidPattern { .. })
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}
