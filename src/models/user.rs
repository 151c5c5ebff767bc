//! User Model

use serde::{Deserialize, Serialize};

/// A tutoring user. Created once at first run and immutable thereafter;
/// identity for sessions, scores, and topic stats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

impl User {
    /// Create a user with a fresh identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
