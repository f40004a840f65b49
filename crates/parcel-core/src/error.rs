//! Error types for the parcel poller
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for parcel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the parcel poller
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream errors that don't fit a more specific variant
    #[error("Upstream error ({service}): {message}")]
    Upstream {
        /// Name of the shipment source
        service: String,
        /// Error message
        message: String,
    },

    /// Config entry store errors
    #[error("Entry store error: {0}")]
    EntryStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors and unexpected status codes
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API rejected the credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A fetch did not complete within the configured bound
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an upstream error tagged with the source name
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an entry store error
    pub fn entry_store(msg: impl Into<String>) -> Self {
        Self::EntryStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Whether this error means the credential itself was refused
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}
