//! Step Tutor Core
//!
//! Foundation crate for the Step Tutor workspace. Provides:
//! - The SSE stream decoder that turns chunked gateway responses into
//!   incremental text deltas
//! - The key-value persistence port shared by the scoring and session layers
//! - Core error types
//!
//! This crate stays dependency-light (serde + thiserror + tracing) so that
//! both the gateway crate and the application crate can build on it without
//! pulling in transport or runtime dependencies.

pub mod error;
pub mod store;
pub mod streaming;

pub use error::{CoreError, CoreResult};
pub use store::{KeyValueStore, MemoryStore};
pub use streaming::{SseDecoder, StreamEvent};
