//! Error types for the storage core

use thiserror::Error;

/// Main error type for the storage core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (empty index name, invalid interval, ...)
    ///
    /// Raised at setup time, before any data is touched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Aggregation parameter error
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Backend execution error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Create a backend execution error
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// Create an aggregation parameter error
    pub fn aggregation(message: impl Into<String>) -> Self {
        Error::Aggregation(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
