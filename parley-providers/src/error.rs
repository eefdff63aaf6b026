//! Conversions from transport errors to core errors

use parley_core::Error as CoreError;
use reqwest::StatusCode;

/// A failure while establishing the upstream call
pub fn connect_error(error: reqwest::Error) -> CoreError {
    CoreError::UpstreamUnavailable {
        message: error.to_string(),
        status: error.status().map(|s| s.as_u16()),
    }
}

/// The upstream answered with a non-success status
pub fn status_error(status: StatusCode, body: &str) -> CoreError {
    let message = if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    };
    CoreError::UpstreamUnavailable {
        message,
        status: Some(status.as_u16()),
    }
}

/// A failure while reading the response body
pub fn body_error(error: reqwest::Error) -> CoreError {
    CoreError::UpstreamStream(error.to_string())
}
