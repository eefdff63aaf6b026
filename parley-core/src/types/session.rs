//! Chat session and message records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to a session until its first message arrives
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// The role of a message in a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user
    User,
    /// Message generated by the backend
    Assistant,
}

impl Role {
    /// The wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: String,
    /// Display title, replaced by the first prompt
    pub title: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a fresh id and the default title
    pub fn new() -> Self {
        Self::with_title(DEFAULT_SESSION_TITLE)
    }

    /// Create a session with a fresh id and the given title
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// One turn in a session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Owning session
    pub session_id: String,
    /// Who produced the message
    pub role: Role,
    /// Text content
    pub content: String,
    /// When the message was recorded
    pub timestamp: DateTime<Utc>,
    /// Set when the content is a partial generation cut short by a cancel
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            interrupted: false,
        }
    }

    /// Create a user message
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id, Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id, Role::Assistant, content)
    }

    /// Mark the message as an interrupted partial generation
    pub fn interrupted(mut self) -> Self {
        self.interrupted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"assistant\"").unwrap(),
            Role::Assistant
        );
    }

    #[test]
    fn test_new_session_has_default_title() {
        let a = Session::new();
        let b = Session::new();
        assert_eq!(a.title, DEFAULT_SESSION_TITLE);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_interrupted_flag_only_serialized_when_set() {
        let msg = Message::assistant("s1", "Hel");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("interrupted").is_none());

        let json = serde_json::to_value(msg.clone().interrupted()).unwrap();
        assert_eq!(json["interrupted"], serde_json::json!(true));

        let back: Message = serde_json::from_value(serde_json::to_value(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
