//! Request conversion for the Ollama generate endpoint

use crate::ollama::OllamaConfig;
use parley_core::GenerateRequest;
use serde::Serialize;

/// Body of a `POST /api/generate` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateBody {
    /// Model identifier
    pub model: String,
    /// Prompt text
    pub prompt: String,
    /// Always `true` for relay calls
    pub stream: bool,
}

impl GenerateBody {
    /// Build the streaming body for a request, falling back to the
    /// configured model
    pub fn streaming(request: GenerateRequest, config: &OllamaConfig) -> Self {
        Self {
            model: request.model.unwrap_or_else(|| config.model.clone()),
            prompt: request.prompt,
            stream: true,
        }
    }
}
