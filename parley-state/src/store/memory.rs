//! In-memory record store implementation

use super::{newest_first, SessionRecord};
use crate::{RecordStore, StateError, StateResult};
use async_trait::async_trait;
use parley_core::{Message, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// In-memory record store implementation
///
/// Suitable for development, tests and short-lived processes. Data is lost
/// when the process stops.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored sessions
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Remove every session
    pub async fn clear(&self) {
        self.records.write().await.clear();
        debug!("Cleared all sessions from memory store");
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_session(&self) -> StateResult<Session> {
        let session = Session::new();
        self.records
            .write()
            .await
            .insert(session.id.clone(), SessionRecord::new(session.clone()));
        debug!(session_id = %session.id, "Created session in memory store");
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> StateResult<Session> {
        trace!(%session_id, "Loading session from memory store");
        self.records
            .read()
            .await
            .get(session_id)
            .map(|r| r.session.clone())
            .ok_or_else(|| StateError::NotFound(session_id.to_string()))
    }

    async fn set_session_title(&self, session_id: &str, title: &str) -> StateResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(session_id)
            .ok_or_else(|| StateError::NotFound(session_id.to_string()))?;
        record.session.title = title.to_string();
        Ok(())
    }

    async fn save_message(&self, message: Message) -> StateResult<Message> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&message.session_id)
            .ok_or_else(|| StateError::NotFound(message.session_id.clone()))?;
        record.messages.push(message.clone());
        trace!(session_id = %message.session_id, role = %message.role, "Saved message");
        Ok(message)
    }

    async fn list_sessions(&self) -> StateResult<Vec<Session>> {
        let mut sessions: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .map(|r| r.session.clone())
            .collect();
        newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn list_messages(&self, session_id: &str) -> StateResult<Vec<Message>> {
        self.records
            .read()
            .await
            .get(session_id)
            .map(SessionRecord::sorted_messages)
            .ok_or_else(|| StateError::NotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Role;

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        let session = store.create_session().await.unwrap();
        store
            .append_message(&session.id, Role::User, "hi")
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);

        store.clear().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let session = store.create_session().await.unwrap();
        assert_eq!(clone.get_session(&session.id).await.unwrap(), session);
    }
}
