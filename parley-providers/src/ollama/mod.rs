//! Ollama backend implementation

mod config;
mod converter;
mod provider;


pub use config::{OllamaConfig, OllamaConfigBuilder};
pub use converter::GenerateBody;
pub use provider::Ollama;
