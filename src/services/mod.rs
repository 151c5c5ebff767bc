//! Business Logic Services

pub mod classifier;
pub mod leaderboard;
pub mod topics;
pub mod tutor;
pub mod voice;
