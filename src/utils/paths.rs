//! Cross-Platform Path Utilities
//!
//! Resolves the application data directory (~/.step-tutor/) used by the
//! file-backed store.

use std::path::{Path, PathBuf};

use step_tutor_core::CoreError;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::internal("Could not determine home directory"))
}

/// Get the Step Tutor directory (~/.step-tutor/)
pub fn step_tutor_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".step-tutor"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(CoreError::from)?;
    }
    Ok(())
}

/// Get the Step Tutor directory, creating if it doesn't exist
pub fn ensure_step_tutor_dir() -> AppResult<PathBuf> {
    let path = step_tutor_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
