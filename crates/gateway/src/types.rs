//! Gateway Wire Types
//!
//! Request body and error taxonomy for the tutoring gateway endpoint. The
//! body shape matches what the gateway expects: conversation history, an
//! optional base64 problem image, the guidance mode, and practice-mode flags.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a message on the wire. Domain roles (student/bot) are mapped to
/// these by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Assistant,
}

/// A single conversation message as sent to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    /// Create a user (student) message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant (bot) message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for a tutoring exchange.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Full accumulated conversation history
    pub messages: Vec<WireMessage>,
    /// Base64-encoded problem image, when the session started from a photo
    pub image_base64: Option<String>,
    /// "guided" or "soft"
    pub guidance_mode: String,
    /// Whether this session was seeded from a previously seen topic
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub practice_mode: bool,
    /// Topic to generate a practice problem for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_topic: Option<String>,
}

impl ChatRequest {
    /// Create a request with history and optional image
    pub fn new(
        messages: Vec<WireMessage>,
        image_base64: Option<String>,
        guidance_mode: impl Into<String>,
    ) -> Self {
        Self {
            messages,
            image_base64,
            guidance_mode: guidance_mode.into(),
            practice_mode: false,
            practice_topic: None,
        }
    }

    /// Create a practice-mode request seeding a problem for `topic`
    pub fn practice(topic: impl Into<String>, guidance_mode: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            image_base64: None,
            guidance_mode: guidance_mode.into(),
            practice_mode: true,
            practice_topic: Some(topic.into()),
        }
    }
}

/// Connection settings for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Full URL of the tutoring endpoint
    pub base_url: String,
    /// Bearer token sent on every request
    pub api_key: String,
}

/// Typed gateway failures.
///
/// The first three variants carry user-facing meaning; `Network` and
/// `Stream` cover transport failures before and during the response stream.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP 429 from the gateway
    #[error("Rate limited by the gateway")]
    RateLimited,

    /// HTTP 402 from the gateway
    #[error("Payment required by the gateway")]
    PaymentRequired,

    /// Any other non-2xx response
    #[error("Request failed with status {status}")]
    RequestFailed { status: u16 },

    /// Connection-level failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Transport failure mid-stream
    #[error("Stream read error: {0}")]
    Stream(String),
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Map an HTTP status code to the matching error variant.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            402 => Self::PaymentRequired,
            other => Self::RequestFailed { status: other },
        }
    }

    /// User-visible notification text for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited => "Rate limit exceeded. Please wait a moment and try again.",
            Self::PaymentRequired => "Credits required. Please add credits to continue.",
            _ => "Failed to get response",
        }
    }
}
