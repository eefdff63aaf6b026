//! Generation backends for the Parley relay
//!
//! The [`ollama`] module talks to an Ollama-compatible `/api/generate`
//! endpoint. Its newline-delimited JSON body is turned into
//! [`Fragment`](parley_core::Fragment)s by the [`decoder`] module, which any
//! other line-framed backend can reuse.

#![warn(missing_docs)]

pub mod constants;
pub mod decoder;
pub mod error;
pub mod http;
pub mod ollama;
pub mod stream;

pub use decoder::{Decoded, FrameDecoder, LinePolicy};
pub use ollama::{Ollama, OllamaConfig};
pub use stream::DecodedStream;
