//! Constants for backend implementations

use std::time::Duration;

/// Default Ollama base URL
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default Ollama model
pub const OLLAMA_DEFAULT_MODEL: &str = "gemma3:1b";

/// Path of the streaming generate endpoint
pub const OLLAMA_GENERATE_PATH: &str = "/api/generate";

/// Record field carrying the generated text delta
pub const OLLAMA_TEXT_FIELD: &str = "response";

/// Environment variable overriding the base URL
pub const OLLAMA_BASE_URL_ENV: &str = "OLLAMA_BASE_URL";

/// Environment variable overriding the model
pub const OLLAMA_MODEL_ENV: &str = "OLLAMA_MODEL";

/// Time allowed to establish the upstream TCP connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
