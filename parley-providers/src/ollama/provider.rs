//! Ollama backend implementation
//!
//! Streams completions from Ollama's `/api/generate` endpoint. The response
//! body is newline-delimited JSON with the text delta in the `response` field.

use async_trait::async_trait;
use parley_core::{Backend, Error, FragmentStream, GenerateRequest};
use std::sync::Arc;
use tracing::debug;

use crate::decoder::FrameDecoder;
use crate::http::{ndjson_headers, HttpClient, ReqwestClient};
use crate::ollama::{config::OllamaConfig, converter::GenerateBody};
use crate::stream::DecodedStream;

/// Ollama generation backend
///
/// # Example
///
/// ```no_run
/// use parley_providers::Ollama;
/// use parley_providers::ollama::OllamaConfig;
///
/// # fn example() -> Result<(), parley_core::Error> {
/// // Local instance with defaults
/// let backend = Ollama::local()?;
///
/// // Remote instance
/// let config = OllamaConfig::builder()
///     .base_url("http://gpu-box:11434")
///     .model("llama3.2")
///     .build()?;
/// let backend = Ollama::from_config(config)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Ollama {
    config: OllamaConfig,
    client: Arc<dyn HttpClient>,
}

impl Ollama {
    /// Create a backend with the given configuration and client
    pub fn new(config: OllamaConfig, client: Arc<dyn HttpClient>) -> Self {
        Self { config, client }
    }

    /// Create a backend with a reqwest client built from the configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self, Error> {
        let client = Arc::new(ReqwestClient::new(config.connect_timeout)?);
        Ok(Self::new(config, client))
    }

    /// Create a backend for the default local instance
    pub fn local() -> Result<Self, Error> {
        Self::from_config(OllamaConfig::default())
    }

    /// Create a backend for a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, Error> {
        Self::from_config(OllamaConfig::builder().base_url(base_url).build()?)
    }

    /// The active configuration
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn decoder(&self) -> FrameDecoder {
        FrameDecoder::new(self.config.text_field.clone()).with_policy(self.config.line_policy)
    }
}

#[async_trait]
impl Backend for Ollama {
    async fn generate(&self, request: GenerateRequest) -> Result<FragmentStream, Error> {
        let body = GenerateBody::streaming(request, &self.config);
        debug!(model = %body.model, prompt_len = body.prompt.len(), "Opening generate stream");

        let body = serde_json::to_value(body)?;
        let response = self
            .client
            .post_stream(&self.config.generate_url(), ndjson_headers(), body)
            .await?;

        Ok(Box::pin(DecodedStream::new(response, self.decoder())))
    }
}
