//! Step Tutor - Tutoring Client Library
//!
//! Core of an interactive tutoring chat client. It includes:
//! - The session orchestrator that streams assistant replies and drives the
//!   mode-selection / problem-intake / tutoring / completed lifecycle
//! - Scoring and per-topic accuracy services over a pluggable key-value store
//! - The silence-driven voice submission controller
//! - Data models and the file-backed storage layer

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::leaderboard::{LeaderboardEntry, ScoreResult};
pub use models::message::{ChatMessage, MessageRole};
pub use models::session::{ChatSession, GuidanceMode, SolutionStep};
pub use models::topics::{TopicStats, UserTopicStats};
pub use models::user::User;
pub use services::classifier::ResponseClassifier;
pub use services::leaderboard::LeaderboardService;
pub use services::topics::TopicService;
pub use services::tutor::{TutorEvent, TutorPhase, TutorService};
pub use services::voice::{clean_text_for_speech, AnswerSink, VoiceConfig, VoiceController, VoicePhase};
pub use storage::file::FileStore;
pub use storage::repository::TutorRepository;
pub use utils::error::{AppError, AppResult};
