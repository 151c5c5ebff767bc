//! Topic Statistics Models

use serde::{Deserialize, Serialize};

/// Per-topic answer counters. An entry may exist with `total_questions = 0`:
/// topic discovery (registration) and topic scoring are decoupled events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicStats {
    pub topic: String,
    pub total_questions: u32,
    pub correctly_answered: u32,
}

impl TopicStats {
    /// Create a registered-but-unscored topic entry
    pub fn registered(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            total_questions: 0,
            correctly_answered: 0,
        }
    }
}

/// All topic counters for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserTopicStats {
    pub user_id: String,
    pub stats: Vec<TopicStats>,
}
