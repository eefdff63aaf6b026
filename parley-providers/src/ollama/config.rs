//! Ollama backend configuration

use crate::constants::*;
use crate::decoder::LinePolicy;
use parley_core::Error;
use std::time::Duration;
use url::Url;

/// Configuration for the Ollama backend
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API, without a trailing slash
    pub base_url: String,
    /// Model used when a request does not name one
    pub model: String,
    /// Record field carrying the text delta
    pub text_field: String,
    /// Handling of lines that are not well-formed records
    pub line_policy: LinePolicy,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_DEFAULT_BASE_URL.to_string(),
            model: OLLAMA_DEFAULT_MODEL.to_string(),
            text_field: OLLAMA_TEXT_FIELD.to_string(),
            line_policy: LinePolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration builder
    pub fn builder() -> OllamaConfigBuilder {
        OllamaConfigBuilder::new()
    }

    /// Defaults overridden by `OLLAMA_BASE_URL` and `OLLAMA_MODEL`
    pub fn from_env() -> Result<Self, Error> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var(OLLAMA_BASE_URL_ENV) {
            builder = builder.base_url(url);
        }
        if let Ok(model) = std::env::var(OLLAMA_MODEL_ENV) {
            builder = builder.model(model);
        }
        builder.build()
    }

    /// Full URL of the streaming generate endpoint
    pub fn generate_url(&self) -> String {
        format!("{}{}", self.base_url, OLLAMA_GENERATE_PATH)
    }
}

/// Builder for Ollama configuration
#[derive(Debug, Default)]
pub struct OllamaConfigBuilder {
    base_url: Option<String>,
    model: Option<String>,
    text_field: Option<String>,
    line_policy: Option<LinePolicy>,
    connect_timeout: Option<Duration>,
}

impl OllamaConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the default model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the record field that carries the text delta
    pub fn text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = Some(field.into());
        self
    }

    /// Set the malformed-line policy
    pub fn line_policy(mut self, policy: LinePolicy) -> Self {
        self.line_policy = Some(policy);
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the configuration, validating the base URL
    pub fn build(self) -> Result<OllamaConfig, Error> {
        let defaults = OllamaConfig::default();

        let base_url = self.base_url.unwrap_or(defaults.base_url);
        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::Configuration(format!("Invalid base URL {:?}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let text_field = self.text_field.unwrap_or(defaults.text_field);
        if text_field.is_empty() {
            return Err(Error::Configuration("Text field must not be empty".into()));
        }

        Ok(OllamaConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: self.model.unwrap_or(defaults.model),
            text_field,
            line_policy: self.line_policy.unwrap_or(defaults.line_policy),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
        })
    }
}
