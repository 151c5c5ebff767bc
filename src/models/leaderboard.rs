//! Leaderboard Models

use serde::{Deserialize, Serialize};

/// One leaderboard row. Score is monotonically non-decreasing; entries are
/// created lazily on a user's first score award.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user_name: String,
    pub score: u32,
}

/// Outcome of a score award. Ephemeral: computed for the celebration
/// overlay, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// 1-based rank before the award
    pub previous_rank: usize,
    /// 1-based rank after the award
    pub new_rank: usize,
    /// The user's total score after the award
    pub total_score: u32,
}
