//! Chat control surface
//!
//! The operations a transport layer (HTTP routes, a CLI) maps its requests
//! onto. Relays started here run on their own tokio task, so a slow or
//! vanished client never blocks the caller.

use crate::config::{ChatConfig, RelayConfig};
use crate::coordinator::{RelayCoordinator, RelayOutcome};
use crate::registry::SessionRegistry;
use crate::sink::{channel, RelayStream};
use parley_core::{Backend, Error, Message, Result, Session};
use parley_state::RecordStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Result of a stop command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStatus {
    /// An active relay was signalled
    Cancelled,
    /// No relay was active for the session
    NotFound,
}

/// A relay running in the background
#[derive(Debug)]
pub struct RelayTask {
    /// Fragments as they arrive; ends on completion or cancel, yields one
    /// `Err` on failure
    pub stream: RelayStream,
    /// Resolves once the relay has finished persisting
    pub outcome: JoinHandle<Result<RelayOutcome>>,
}

/// Chat sessions with streamed replies
#[derive(Clone)]
pub struct ChatService {
    coordinator: Arc<RelayCoordinator>,
    config: ChatConfig,
}

impl ChatService {
    /// Create a service over an existing coordinator
    pub fn new(coordinator: RelayCoordinator, config: ChatConfig) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            config,
        }
    }

    /// Create a service with a fresh registry and default settings
    pub fn with_defaults(backend: Arc<dyn Backend>, store: Arc<dyn RecordStore>) -> Self {
        let coordinator =
            RelayCoordinator::new(backend, store, SessionRegistry::new(), RelayConfig::default());
        Self::new(coordinator, ChatConfig::default())
    }

    /// The coordinator relays run on
    pub fn coordinator(&self) -> &RelayCoordinator {
        &self.coordinator
    }

    fn store(&self) -> &Arc<dyn RecordStore> {
        self.coordinator.store()
    }

    /// Create an empty chat titled "New Chat"
    pub async fn create_chat(&self) -> Result<Session> {
        let session = self.store().create_session().await?;
        info!(session_id = %session.id, "Created chat");
        Ok(session)
    }

    /// All chats, newest first
    pub async fn list_chats(&self) -> Result<Vec<Session>> {
        Ok(self.store().list_sessions().await?)
    }

    /// A chat's messages, oldest first
    pub async fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self.store().list_messages(session_id).await?)
    }

    /// Send a prompt and start streaming the reply
    ///
    /// The first prompt of a chat also becomes its title.
    pub async fn send_message(&self, session_id: &str, prompt: &str) -> Result<RelayTask> {
        if prompt.trim().is_empty() {
            return Err(Error::Validation("prompt is empty".into()));
        }
        // Claim the session before touching it, so a concurrent sender is
        // turned away without retitling the chat
        let handle = self
            .coordinator
            .registry()
            .try_register(session_id)
            .ok_or_else(|| Error::RelayBusy(session_id.to_string()))?;

        if let Err(e) = self.title_if_first(session_id, prompt).await {
            self.coordinator.registry().release_handle(&handle);
            return Err(e);
        }

        let (mut sink, stream) = channel(self.coordinator.config().channel_capacity);
        let coordinator = Arc::clone(&self.coordinator);
        let prompt = prompt.to_string();
        let outcome = tokio::spawn(async move {
            coordinator
                .relay_claimed(handle, &prompt, &mut sink)
                .await
        });

        Ok(RelayTask { stream, outcome })
    }

    async fn title_if_first(&self, session_id: &str, prompt: &str) -> Result<()> {
        let history = self.store().list_messages(session_id).await?;
        if history.is_empty() {
            let title = title_from_prompt(prompt, self.config.title_max_chars);
            self.store().set_session_title(session_id, &title).await?;
            debug!(%session_id, %title, "Titled chat");
        }
        Ok(())
    }

    /// Abort the session's in-flight relay
    pub fn stop(&self, session_id: &str) -> CancelStatus {
        if self.coordinator.cancel(session_id) {
            CancelStatus::Cancelled
        } else {
            CancelStatus::NotFound
        }
    }

    /// Whether a reply is currently streaming for the session
    pub fn is_streaming(&self, session_id: &str) -> bool {
        self.coordinator.registry().is_active(session_id)
    }
}

fn title_from_prompt(prompt: &str, max_chars: usize) -> String {
    let prompt = prompt.trim();
    match prompt.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}
