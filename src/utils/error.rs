//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use step_tutor_core::CoreError;
use step_tutor_gateway::GatewayError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Gateway transport and status failures
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Errors bubbled up from the core crate
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// A request is already in flight for this session
    #[error("A request is already in flight")]
    Busy,

    /// Operation not valid in the current session phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create an invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// User-visible notification text for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(err) => err.user_message().to_string(),
            Self::Busy => "Please wait for the current response to finish.".to_string(),
            other => other.to_string(),
        }
    }
}
