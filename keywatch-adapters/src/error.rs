//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur while talking to the outside world.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP return code is not OK, but {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The response parsed but did not carry the statistics map.
    #[error("invalid response, nil statistics map")]
    InvalidResponse,

    /// The operation was cancelled by its caller.
    #[error("context closing")]
    ContextClosing,

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The mail server refused or failed the delivery.
    #[error("SMTP delivery failed: {0}")]
    Mail(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// An identity list file contains an invalid entry.
    #[error("{reason} on line {line}")]
    ListFile { line: usize, reason: String },

    /// Reading a local file failed.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Parse(err.to_string())
    }
}
