//! Chat Session Model

use serde::{Deserialize, Serialize};

use crate::models::message::ChatMessage;

/// Tutoring pace for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceMode {
    /// One step per turn, no auto-advance
    Guided,
    /// Auto-advances after evaluating each answer
    Soft,
}

impl GuidanceMode {
    /// Points awarded for completing a problem in this mode
    pub fn points(&self) -> u32 {
        match self {
            Self::Guided => 100,
            Self::Soft => 50,
        }
    }

    /// Wire value sent to the gateway
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Guided => "guided",
            Self::Soft => "soft",
        }
    }
}

/// One step of a worked solution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolutionStep {
    pub step_number: u32,
    pub description: String,
    pub expected_answer: String,
    pub hint: String,
    pub is_completed: bool,
}

/// A tutoring session. Exactly one session is current per user at a time;
/// sessions are never deleted, only marked completed and superseded by a new
/// current-session pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Unique session identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Free-text problem statement, if the session started from text
    pub problem_text: String,
    /// Problem image reference, if the session started from a photo
    pub problem_image_url: String,
    /// Tutoring pace chosen before the problem started
    pub guidance_mode: GuidanceMode,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last-mutation timestamp (ISO 8601)
    pub updated_at: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Index of the step currently being worked
    pub current_step_index: u32,
    /// Known solution steps, when the tutor has laid them out
    pub solution_steps: Vec<SolutionStep>,
    /// Whether the problem has been fully solved
    pub is_completed: bool,
    /// The question currently posed to the student
    pub current_question: String,
    /// Detected topic; once set, only replaced by a newly detected
    /// non-empty topic, never cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl ChatSession {
    /// Create a fresh session for `user_id` in the given mode
    pub fn new(user_id: impl Into<String>, guidance_mode: GuidanceMode) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            problem_text: String::new(),
            problem_image_url: String::new(),
            guidance_mode,
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
            current_step_index: 0,
            solution_steps: Vec::new(),
            is_completed: false,
            current_question: String::new(),
            topic: None,
        }
    }

    /// Set the detected topic. Empty topics are ignored; an existing topic
    /// is only replaced, never cleared.
    pub fn set_topic(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        if !topic.trim().is_empty() {
            self.topic = Some(topic);
        }
    }
}
