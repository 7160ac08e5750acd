//! Error types for the Globus Flows client.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the Globus Flows client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GlobusError {
    /// Raised when the client configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when the request never produced a response.
    #[error("request to {url} failed: {message}")]
    Http {
        /// Endpoint that was called.
        url: String,
        /// Transport level error message.
        message: String,
    },
    /// Raised when the service answers with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        /// Endpoint that was called.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, typically a JSON error document.
        body: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Endpoint that was called.
        url: String,
        /// Decoder error message.
        message: String,
    },
}

impl GlobusError {
    /// Returns whether the failure is an expired or missing authorisation.
    #[must_use]
    pub const fn is_unauthorised(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

impl From<ConfigError> for GlobusError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
