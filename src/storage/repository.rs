//! Tutor Repository
//!
//! Typed accessors over the key-value port. All lists are unbounded
//! append/update collections keyed by entity id; the current-user and
//! current-session pointers enable resumption across restarts.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use step_tutor_core::store::KeyValueStore;

use crate::models::leaderboard::LeaderboardEntry;
use crate::models::session::ChatSession;
use crate::models::topics::UserTopicStats;
use crate::models::user::User;

/// Logical store keys. Kept stable so existing persisted data keeps loading.
const USERS_KEY: &str = "math_tutor_users";
const SESSIONS_KEY: &str = "math_tutor_sessions";
const LEADERBOARD_KEY: &str = "math_tutor_leaderboard";
const TOPIC_STATS_KEY: &str = "math_tutor_topic_stats";
const CURRENT_USER_KEY: &str = "math_tutor_current_user";
const CURRENT_SESSION_KEY: &str = "math_tutor_current_session";

/// Typed repository over the persistence port.
#[derive(Clone)]
pub struct TutorRepository {
    store: Arc<dyn KeyValueStore>,
}

impl TutorRepository {
    /// Create a repository over the given store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.store.get(key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(err) => {
                warn!(key, %err, "discarding unreadable store list");
                Vec::new()
            }
        }
    }

    fn write_list<T: Serialize>(&self, key: &str, list: &[T]) {
        match serde_json::to_string(list) {
            Ok(raw) => self.store.set(key, &raw),
            Err(err) => warn!(key, %err, "failed to encode store list"),
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// All known users
    pub fn users(&self) -> Vec<User> {
        self.read_list(USERS_KEY)
    }

    /// Look up a user by id
    pub fn user(&self, id: &str) -> Option<User> {
        self.users().into_iter().find(|u| u.id == id)
    }

    /// Create and persist a new user
    pub fn create_user(&self, name: impl Into<String>) -> User {
        let user = User::new(name);
        let mut users = self.users();
        users.push(user.clone());
        self.write_list(USERS_KEY, &users);
        user
    }

    /// Replace the full user list (used for demo seeding)
    pub fn save_users(&self, users: &[User]) {
        self.write_list(USERS_KEY, users);
    }

    /// The user the current-user pointer refers to, if any
    pub fn current_user(&self) -> Option<User> {
        let id = self.store.get(CURRENT_USER_KEY)?;
        self.user(&id)
    }

    /// Point the current-user pointer at `user_id`
    pub fn set_current_user(&self, user_id: &str) {
        self.store.set(CURRENT_USER_KEY, user_id);
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// All persisted sessions
    pub fn sessions(&self) -> Vec<ChatSession> {
        self.read_list(SESSIONS_KEY)
    }

    /// Look up a session by id
    pub fn session(&self, id: &str) -> Option<ChatSession> {
        self.sessions().into_iter().find(|s| s.id == id)
    }

    /// All sessions belonging to `user_id`
    pub fn user_sessions(&self, user_id: &str) -> Vec<ChatSession> {
        self.sessions()
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect()
    }

    /// Persist a newly created session
    pub fn create_session(&self, session: &ChatSession) {
        let mut sessions = self.sessions();
        sessions.push(session.clone());
        self.write_list(SESSIONS_KEY, &sessions);
    }

    /// Persist an updated session, refreshing its `updated_at` stamp.
    /// Unknown sessions are ignored.
    pub fn update_session(&self, session: &ChatSession) {
        let mut sessions = self.sessions();
        if let Some(slot) = sessions.iter_mut().find(|s| s.id == session.id) {
            *slot = session.clone();
            slot.updated_at = chrono::Utc::now().to_rfc3339();
            self.write_list(SESSIONS_KEY, &sessions);
        }
    }

    /// The current-session pointer, if set
    pub fn current_session_id(&self) -> Option<String> {
        self.store.get(CURRENT_SESSION_KEY)
    }

    /// Set or clear the current-session pointer
    pub fn set_current_session_id(&self, session_id: Option<&str>) {
        match session_id {
            Some(id) => self.store.set(CURRENT_SESSION_KEY, id),
            None => self.store.remove(CURRENT_SESSION_KEY),
        }
    }

    // ------------------------------------------------------------------
    // Leaderboard and topic stats (raw lists; logic lives in services)
    // ------------------------------------------------------------------

    /// Raw leaderboard entries in stored order
    pub fn leaderboard_entries(&self) -> Vec<LeaderboardEntry> {
        self.read_list(LEADERBOARD_KEY)
    }

    /// Replace the stored leaderboard
    pub fn save_leaderboard(&self, entries: &[LeaderboardEntry]) {
        self.write_list(LEADERBOARD_KEY, entries);
    }

    /// Topic stats for all users
    pub fn all_topic_stats(&self) -> Vec<UserTopicStats> {
        self.read_list(TOPIC_STATS_KEY)
    }

    /// Replace the stored topic stats
    pub fn save_topic_stats(&self, stats: &[UserTopicStats]) {
        self.write_list(TOPIC_STATS_KEY, stats);
    }
}
