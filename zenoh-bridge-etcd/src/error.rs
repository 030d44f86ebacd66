//! Error types for the etcd bridge.

use thiserror::Error;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),

    #[error("Missing required config setting: {0}")]
    Missing(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
}

/// Zenoh session setup errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid Zenoh mode: '{0}'. Expected 'client', 'peer', or 'router'")]
    InvalidMode(String),

    #[error("Invalid Zenoh config: {0}")]
    Config(String),

    #[error("Failed to open Zenoh session: {0}")]
    Open(String),
}

/// Failure of a single HTTP call against the polled member.
///
/// These never leave the fetch gateway: [`crate::http::Fetcher`] turns
/// every one of them into an absent response after logging it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API call failed: {0}")]
    Network(String),

    #[error("API call timed out")]
    Timeout,

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("JSON parsing failed: {0}")]
    Decode(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Errors raised while handing a record to the dispatch sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for SinkError {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        Self::Serialization(err.to_string())
    }
}
