//! Structured error types for the data client and configuration.
//!
//! Every error is displayable as-is: the chart pipeline publishes the
//! `Display` text of an [`ApiError`] as its user-facing error message.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a [`MarketDataClient`](crate::client::MarketDataClient)
/// or while reshaping its payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The provider answered with a non-2xx status.
    #[error("An error has occurred: {status}")]
    Transport { status: u16 },

    /// The request never produced a response (DNS, refused connection, TLS).
    #[error("network unreachable: {0}")]
    Network(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// The request URL could not be built from the configured base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status carried by a transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { status } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
