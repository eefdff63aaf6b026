//! Chat session and message persistence for Parley
//!
//! The relay only needs a small keyed record store: sessions with a title,
//! and an append-only list of messages per session. [`MemoryStore`] keeps
//! everything in process; [`FileStore`] writes one JSON document per session.

pub mod error;
pub mod store;

pub use error::{StateError, StateResult};
pub use store::{FileStore, MemoryStore, RecordStore};
