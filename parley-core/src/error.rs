//! Error types for the Parley relay

use std::time::Duration;
use thiserror::Error;

/// The main error type for all Parley operations
///
/// Errors are `Clone` because a relay failure is reported twice: once to the
/// caller of the relay and once to the downstream sink that is streaming to
/// the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The upstream call could not be established (connection failure or
    /// non-success status) before any bytes were read
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Error message
        message: String,
        /// HTTP status returned by the upstream, if one was received
        status: Option<u16>,
    },

    /// The upstream failed after streaming had started
    #[error("Upstream stream error: {0}")]
    UpstreamStream(String),

    /// The upstream produced no bytes within the configured idle window
    #[error("Upstream idle for {0:?}")]
    IdleTimeout(Duration),

    /// A command targeted a session that does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A relay is already in flight for the session
    #[error("Relay already active for session {0}")]
    RelayBusy(String),

    /// A record could not be decoded under the strict line policy
    #[error("Decode error: {0}")]
    Decode(String),

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The downstream consumer went away
    #[error("Downstream closed")]
    DownstreamClosed,
}

impl Error {
    /// Create an upstream-unavailable error without a status code
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            status: None,
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether the error happened after the upstream started streaming
    pub fn is_mid_stream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamStream(_) | Error::IdleTimeout(_) | Error::Decode(_)
        )
    }
}

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
