//! Error types for ticketflow-core

use thiserror::Error;

/// Main error type for the ticketflow-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Jira answered with a non-success status
    #[error("Jira API error ({status}): {body}")]
    Http { status: u16, body: String },

    /// Transport failure talking to Jira (timeout, connection, decode)
    #[error("Jira request failed: {0}")]
    Request(String),

    /// Neither a live fetch nor a cached snapshot is available
    #[error("no data available for {dataset}: {hint}")]
    NoData { dataset: String, hint: String },
}

/// Result type alias for ticketflow-core
pub type Result<T> = std::result::Result<T, Error>;
