//! Core traits and types for the Parley streaming relay
//!
//! This crate provides the vocabulary shared by every other Parley crate:
//! chat sessions and their messages, decoded text fragments, the crate-wide
//! error type, and the [`Backend`] trait that generation backends implement.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use backend::{Backend, FragmentStream, GenerateRequest};
pub use error::{Error, Result};
pub use types::{
    fragment::{Fragment, FragmentAccumulator},
    session::{Message, Role, Session, DEFAULT_SESSION_TITLE},
};
