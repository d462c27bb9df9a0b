//! Error types for the session check.

use std::error::Error as StdError;

use thiserror::Error;

/// Transport-level failures of a session check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error checking session at {url}: {source}")]
    Network {
        /// The check URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout checking session at {url}")]
    Timeout {
        /// The check URL.
        url: String,
    },

    /// The endpoint answered with a status that is neither valid nor a rejection.
    #[error("HTTP {status} checking session at {url}")]
    HttpStatus {
        /// The check URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response body from {url}: {reason}")]
    InvalidBody {
        /// The check URL.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// The cookie contains bytes that are not allowed in a header value.
    #[error("cookie cannot be sent as a header value")]
    InvalidCookieHeader,

    /// The configured check URL is malformed.
    #[error("invalid check URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Failure reported by a custom [`SessionCheck`](super::SessionCheck).
    #[error("session check failed: {source}")]
    Custom {
        /// Whether retrying could help.
        transient: bool,
        /// The underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl CheckError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid body error.
    pub fn invalid_body(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an error for a custom check implementation.
    pub fn custom(transient: bool, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Custom {
            transient,
            source: source.into(),
        }
    }
}
