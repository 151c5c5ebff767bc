//! Storage Layer
//!
//! Backends for the key-value persistence port plus the typed repository
//! that the services read and write through.

pub mod file;
pub mod repository;
