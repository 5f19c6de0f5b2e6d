//! Error types for the Mixgarden client.
//!
//! # Design
//! Every non-2xx response lands in `Http` with the raw status code and body,
//! including 404. Callers that care about "does not exist" use
//! [`ApiError::is_not_found`] instead of matching a dedicated variant.
//! Nothing here is retried or recovered locally; errors surface as-is.

use thiserror::Error;

/// Errors returned by the Mixgarden client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client could not be configured, e.g. no API key was available.
    /// Raised before any network activity.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied argument was rejected before building the request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The response body could not be decoded as the expected JSON.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Connection-level failure: DNS, refused connection, TLS.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// HTTP status carried by an `Http` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
