use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for Harvest.
#[derive(Error, Debug)]
pub enum AppError {
    /// The remote explicitly reported the resource as absent (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success HTTP status other than 404.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The response carried a content type the content policy rejects.
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    /// The response body was empty.
    #[error("Downloaded payload is empty")]
    EmptyPayload,

    /// Writing the artifact to local storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    WorkerPanicked(String),

    /// The aggregator saw fewer or more outcomes than jobs enumerated.
    #[error("Run incomplete: expected {expected} outcomes, processed {processed}")]
    Incomplete { expected: u64, processed: u64 },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if a fetch that failed with this error is worth retrying.
    ///
    /// Not-found is permanent within a run; configuration and engine faults
    /// never come from a single fetch and are not retried either.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::HttpError(_)
            | AppError::Timeout(_)
            | AppError::NetworkError(_)
            | AppError::ContentRejected(_)
            | AppError::EmptyPayload
            | AppError::StorageError(_) => true,
            AppError::NotFound(_)
            | AppError::ConfigError(_)
            | AppError::WorkerPanicked(_)
            | AppError::Incomplete { .. }
            | AppError::SerializationError(_)
            | AppError::Generic(_) => false,
        }
    }

    /// Returns true if this error is the terminal "resource absent" classification.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::StorageError(e.to_string())
    }
}
