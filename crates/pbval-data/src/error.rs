//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Provider responded but the payload was unusable
    #[error("Provider error: {0}")]
    Provider(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Missing data
    #[error("Missing data for {code}: {reason}")]
    MissingData {
        /// Instrument code that was queried
        code: String,
        /// Reason for missing data
        reason: String,
    },

    /// Invalid instrument code
    #[error("Invalid instrument code: {0}")]
    InvalidCode(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
