//! Data Models
//!
//! Serde structures for the tutoring domain. Field names serialize in
//! camelCase to keep the persisted JSON layout stable across client
//! versions.

pub mod leaderboard;
pub mod message;
pub mod session;
pub mod topics;
pub mod user;
