//! Error types for record storage

use std::io;
use thiserror::Error;

/// Result type for store operations
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StateError {
    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl StateError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

impl From<StateError> for parley_core::Error {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(id) => parley_core::Error::SessionNotFound(id),
            other => parley_core::Error::Storage(other.to_string()),
        }
    }
}
