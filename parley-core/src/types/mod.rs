//! Core types used throughout the Parley relay

pub mod fragment;
pub mod session;

/// A chat session identifier (opaque string, UUID v4 when created by a store)
pub type SessionId = String;
