//! Record store trait and implementations

use crate::StateResult;
use async_trait::async_trait;
use parley_core::{Message, Role, Session};
use serde::{Deserialize, Serialize};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Keyed store for chat sessions and their messages
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create and persist a session with the default title
    async fn create_session(&self) -> StateResult<Session>;

    /// Load a session by id
    async fn get_session(&self, session_id: &str) -> StateResult<Session>;

    /// Replace a session's title
    async fn set_session_title(&self, session_id: &str, title: &str) -> StateResult<()>;

    /// Persist a fully-formed message under its session
    async fn save_message(&self, message: Message) -> StateResult<Message>;

    /// All sessions, newest first
    async fn list_sessions(&self) -> StateResult<Vec<Session>>;

    /// All messages of a session, oldest first
    async fn list_messages(&self, session_id: &str) -> StateResult<Vec<Message>>;

    /// Create a message stamped now and persist it
    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> StateResult<Message> {
        self.save_message(Message::new(session_id, role, content))
            .await
    }

    /// Check if a session exists
    async fn exists(&self, session_id: &str) -> StateResult<bool> {
        match self.get_session(session_id).await {
            Ok(_) => Ok(true),
            Err(crate::StateError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A session together with its messages, the unit both stores persist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub session: Session,
    pub messages: Vec<Message>,
}

impl SessionRecord {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            messages: Vec::new(),
        }
    }

    pub fn sorted_messages(&self) -> Vec<Message> {
        let mut messages = self.messages.clone();
        // Stable: equal timestamps keep insertion order
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        messages
    }
}

pub(crate) fn newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
