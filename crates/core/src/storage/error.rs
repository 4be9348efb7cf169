//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage root could not be prepared.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Reading the incoming upload stream failed.
    #[error("upload stream failed: {0}")]
    Stream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// Logical path does not point into the uploads directory.
    #[error("invalid storage path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an upload stream error.
    #[must_use]
    pub fn stream(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Stream(err.into())
    }

    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        Self::Operation(err.to_string())
    }
}
