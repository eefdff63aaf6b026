//! Streaming relay and cancellation coordinator
//!
//! A relay operation persists the user's prompt, opens a streaming call on a
//! [`Backend`](parley_core::Backend), forwards each decoded fragment to a
//! [`FragmentSink`] as it arrives and, once the upstream stream ends,
//! persists the accumulated assistant reply. A concurrent
//! [`SessionRegistry::cancel`] aborts the relay at its next suspension point.
//!
//! [`ChatService`] is the control surface an HTTP layer sits on: it creates
//! and lists chats, starts relays on background tasks and stops them.

#![warn(missing_docs)]

mod config;
mod coordinator;
mod registry;
mod service;
mod sink;

pub use config::{ChatConfig, PartialPolicy, RelayConfig, RelayConfigBuilder};
pub use coordinator::{CancelReason, RelayCoordinator, RelayOutcome};
pub use registry::{CancellationHandle, SessionRegistry};
pub use service::{CancelStatus, ChatService, RelayTask};
pub use sink::{channel, ChannelSink, FragmentSink, RelayStream};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::{CancelStatus, ChatService, RelayCoordinator, RelayOutcome, SessionRegistry};
    pub use parley_core::{Error, Fragment, Message, Role, Session};
}
