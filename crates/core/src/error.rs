//! Core Error Types
//!
//! The error set shared across the Step Tutor workspace. The application
//! crate wraps these with variants that require heavier dependencies
//! (gateway transport, etc.).

use thiserror::Error;

/// Core error type for the Step Tutor workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// File I/O errors (data directory creation, store backing files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;
