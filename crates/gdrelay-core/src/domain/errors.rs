//! Domain error types
//!
//! [`DomainError`] covers validation of domain values. [`RelayError`] is the
//! error taxonomy surfaced to callers of the relay: the HTTP layer recovers it
//! from an `anyhow::Error` chain with `downcast_ref` to choose a status code.

use thiserror::Error;

/// Number of response-body characters kept in [`RelayError::Upstream`]
pub const BODY_EXCERPT_CHARS: usize = 1000;

/// Errors that can occur when constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid page token
    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    /// Invalid Drive file identifier
    #[error("Invalid file ID: {0}")]
    InvalidFileId(String),

    /// Invalid watch channel identifier
    #[error("Invalid channel ID: {0}")]
    InvalidChannelId(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}

/// Errors raised by the relay use cases
///
/// Adapters report failures as `anyhow::Error`; use cases wrap the cases that
/// callers must distinguish in one of these variants.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or invalid configuration (callback URL, credentials, dataset)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An inbound notification carried the wrong channel token
    #[error("Channel token mismatch")]
    Unauthorized,

    /// The deferred credential check for a remote service failed
    #[error("Not connected to {service}: {reason}")]
    NotConnected {
        /// Service that could not be reached ("drive", "dify")
        service: &'static str,
        /// Underlying failure
        reason: String,
    },

    /// The cursor store holds no page token; the watch has never been initialized
    #[error("No page token stored; initialize the watch channel first")]
    MissingCursor,

    /// A remote service answered with a failure status
    #[error("{service} returned {status}: {body}")]
    Upstream {
        /// Service that failed ("drive", "dify")
        service: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Another process holds the cycle lease
    #[error("Another cycle is running: {0}")]
    Busy(String),
}

impl RelayError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Upstream failure keeping the first [`BODY_EXCERPT_CHARS`] characters of `body`
    pub fn upstream(service: &'static str, status: u16, body: &str) -> Self {
        Self::Upstream {
            service,
            status,
            body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
        }
    }
}
