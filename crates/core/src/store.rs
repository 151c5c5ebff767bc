//! Persistence Port
//!
//! Single seam for all persisted state. Values are JSON-encoded strings
//! keyed by logical entity name; read-modify-write sequences are not atomic,
//! which is acceptable under this client's single-writer semantics.
//!
//! The port is infallible by contract: callers that need retry or error
//! policies wrap their own store implementation around it.

use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value persistence port shared by the scoring, topic, and session
/// layers. Implementations must be safe to share behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str);

    /// Remove the value stored under `key`
    fn remove(&self, key: &str);
}

/// In-memory store used by tests and as a default backing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .expect("store lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .expect("store lock poisoned")
            .remove(key);
    }
}
