//! Error types for fetching and decoding the event feed.

use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum QuakeError {
    /// Unreachable host, non-success status or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Body is not valid JSON or lacks a required field.
    #[error("failed to decode event feed: {0}")]
    Decode(String),

    /// The query matched no events.
    #[error("no earthquakes matched the query")]
    EmptyData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type QuakeResult<T> = std::result::Result<T, QuakeError>;
