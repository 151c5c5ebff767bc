//! Leaderboard Service
//!
//! Score ledger over the persisted leaderboard list. Ranks are 1-based
//! positions in the descending-score ordering; the relative order of equal
//! scores is unspecified and callers must not rely on it.

use tracing::info;

use crate::models::leaderboard::{LeaderboardEntry, ScoreResult};
use crate::models::user::User;
use crate::storage::repository::TutorRepository;

/// Demo rows inserted on first run so a fresh leaderboard is not empty.
const DEMO_ROWS: &[(&str, &str, u32)] = &[
    ("demo-1", "Alexander Schmidt", 1250),
    ("demo-2", "Emma Johnson", 980),
    ("demo-3", "Lucas Müller", 750),
    ("demo-4", "Sophia Williams", 620),
    ("demo-5", "Oliver Brown", 450),
];

/// Score ledger and ranking service.
#[derive(Clone)]
pub struct LeaderboardService {
    repo: TutorRepository,
}

impl LeaderboardService {
    /// Create a service over the given repository
    pub fn new(repo: TutorRepository) -> Self {
        Self { repo }
    }

    /// The leaderboard sorted by descending score.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries = self.repo.leaderboard_entries();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    /// Award `delta` points to a user, creating their entry lazily.
    ///
    /// `previous_rank` is the user's 1-based position before the mutation
    /// (one past the end if they had no entry); `new_rank` is recomputed
    /// from the post-mutation ordering.
    pub fn add_score(&self, user_id: &str, user_name: &str, delta: u32) -> ScoreResult {
        let before = self.leaderboard();
        let previous_rank = before
            .iter()
            .position(|e| e.user_id == user_id)
            .map(|i| i + 1)
            .unwrap_or(before.len() + 1);

        let mut entries = self.repo.leaderboard_entries();
        let total_score = match entries.iter_mut().find(|e| e.user_id == user_id) {
            Some(entry) => {
                entry.score += delta;
                entry.score
            }
            None => {
                entries.push(LeaderboardEntry {
                    user_id: user_id.to_string(),
                    user_name: user_name.to_string(),
                    score: delta,
                });
                delta
            }
        };
        self.repo.save_leaderboard(&entries);

        let after = self.leaderboard();
        let new_rank = after
            .iter()
            .position(|e| e.user_id == user_id)
            .map(|i| i + 1)
            .unwrap_or(after.len());

        info!(user_id, delta, total_score, previous_rank, new_rank, "score awarded");
        ScoreResult {
            previous_rank,
            new_rank,
            total_score,
        }
    }

    /// Seed demo users and leaderboard rows when both are empty.
    /// Idempotent: existing data is never touched.
    pub fn seed_demo_data(&self) {
        if self.repo.users().is_empty() {
            let users: Vec<User> = DEMO_ROWS
                .iter()
                .map(|(id, name, _)| User {
                    id: id.to_string(),
                    name: name.to_string(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                })
                .collect();
            self.repo.save_users(&users);
        }

        if self.repo.leaderboard_entries().is_empty() {
            let entries: Vec<LeaderboardEntry> = DEMO_ROWS
                .iter()
                .map(|(id, name, score)| LeaderboardEntry {
                    user_id: id.to_string(),
                    user_name: name.to_string(),
                    score: *score,
                })
                .collect();
            self.repo.save_leaderboard(&entries);
        }
    }
}
