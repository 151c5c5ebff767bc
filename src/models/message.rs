//! Chat Message Model

use serde::{Deserialize, Serialize};

/// Who authored a message within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The tutor (assistant)
    Bot,
    /// The learner
    Student,
}

/// A single chat message. Messages are append-only within a session; the
/// trailing bot message is the only one mutated in place, and only while its
/// stream is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Author role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Creation timestamp (ISO 8601)
    pub timestamp: String,
}

impl ChatMessage {
    /// Create a message with a fresh identifier and current timestamp
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a student message
    pub fn student(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Student, content)
    }

    /// Create a bot message
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Bot, content)
    }
}
