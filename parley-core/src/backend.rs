//! Generation backend trait

use crate::error::Result;
use crate::types::fragment::Fragment;
use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;

/// Lazy, ordered stream of decoded fragments from one upstream call
///
/// The stream yields text fragments in arrival order followed by exactly one
/// [`Fragment::end`] marker. Dropping the stream closes the upstream
/// connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// A single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Model identifier; the backend's configured default when `None`
    pub model: Option<String>,
    /// Prompt text
    pub prompt: String,
}

impl GenerateRequest {
    /// Create a request for the backend's default model
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
        }
    }

    /// Target a specific model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// An upstream text-generation service
///
/// `generate` resolves once the upstream has accepted the request with a
/// success status; failures up to that point are reported as
/// [`Error::UpstreamUnavailable`](crate::Error::UpstreamUnavailable).
/// Callers abort an in-flight call by dropping the returned future or
/// stream.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a streaming generation call
    async fn generate(&self, request: GenerateRequest) -> Result<FragmentStream>;
}
