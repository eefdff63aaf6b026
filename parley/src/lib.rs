//! Parley - a streaming chat relay for local LLM backends
//!
//! Parley sits between a chat client and an Ollama-compatible generation
//! endpoint. It forwards the reply fragment by fragment as the backend
//! produces it, persists the conversation, and lets the client stop a reply
//! mid-stream.
//!
//! # Quick Start
//!
//! ```no_run
//! # use parley::prelude::*;
//! # use parley::providers::Ollama;
//! # use parley::state::MemoryStore;
//! # use futures::StreamExt;
//! # use std::sync::Arc;
//! #
//! # #[tokio::main]
//! # async fn main() -> Result<(), parley::Error> {
//!     let service = ChatService::with_defaults(
//!         Arc::new(Ollama::local()?),
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     let chat = service.create_chat().await?;
//!     let mut task = service.send_message(&chat.id, "Why is the sky blue?").await?;
//!     while let Some(fragment) = task.stream.next().await {
//!         print!("{}", fragment?);
//!     }
//! #     Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use parley_core::*;

#[cfg(feature = "providers")]
#[cfg_attr(docsrs, doc(cfg(feature = "providers")))]
pub mod providers {
    //! Generation backends and the line-framed decoder
    pub use parley_providers::*;
}

#[cfg(feature = "state")]
#[cfg_attr(docsrs, doc(cfg(feature = "state")))]
pub mod state {
    //! Session and message persistence
    pub use parley_state::*;
}

#[cfg(feature = "relay")]
#[cfg_attr(docsrs, doc(cfg(feature = "relay")))]
pub mod relay {
    //! Relay coordinator, cancellation registry and chat service
    pub use parley_relay::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use parley_core::{Backend, Error, Fragment, GenerateRequest, Message, Role, Session};

    #[cfg(feature = "providers")]
    pub use parley_providers::{Ollama, OllamaConfig};

    #[cfg(feature = "state")]
    pub use parley_state::{FileStore, MemoryStore, RecordStore};

    #[cfg(feature = "relay")]
    pub use parley_relay::{
        CancelStatus, ChatService, PartialPolicy, RelayConfig, RelayCoordinator, RelayOutcome,
        SessionRegistry,
    };
}
