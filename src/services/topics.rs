//! Topic Service
//!
//! Per-user, per-topic answer counters. Topic discovery (registration) and
//! topic scoring are decoupled: a topic can be registered while a problem is
//! still in progress without touching its counters.

use std::collections::BTreeSet;

use crate::models::topics::{TopicStats, UserTopicStats};
use crate::storage::repository::TutorRepository;

/// Topic accuracy tracking service.
#[derive(Clone)]
pub struct TopicService {
    repo: TutorRepository,
}

impl TopicService {
    /// Create a service over the given repository
    pub fn new(repo: TutorRepository) -> Self {
        Self { repo }
    }

    /// Record activity for a topic.
    ///
    /// With `register_only` the entry's existence is ensured but counters
    /// stay untouched; otherwise `total_questions` is incremented and
    /// `correctly_answered` as well when `is_correct`.
    pub fn update_topic_stats(
        &self,
        user_id: &str,
        topic: &str,
        is_correct: bool,
        register_only: bool,
    ) {
        let mut all = self.repo.all_topic_stats();

        let index = match all.iter().position(|s| s.user_id == user_id) {
            Some(index) => index,
            None => {
                all.push(UserTopicStats {
                    user_id: user_id.to_string(),
                    stats: Vec::new(),
                });
                all.len() - 1
            }
        };
        let user_stats = &mut all[index];

        if !user_stats.stats.iter().any(|s| s.topic == topic) {
            user_stats.stats.push(TopicStats::registered(topic));
        }

        if !register_only {
            if let Some(entry) = user_stats.stats.iter_mut().find(|s| s.topic == topic) {
                entry.total_questions += 1;
                if is_correct {
                    entry.correctly_answered += 1;
                }
            }
        }

        self.repo.save_topic_stats(&all);
    }

    /// All topic counters for one user
    pub fn user_topic_stats(&self, user_id: &str) -> Vec<TopicStats> {
        self.repo
            .all_topic_stats()
            .into_iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.stats)
            .unwrap_or_default()
    }

    /// De-duplicated, lexicographically sorted union of topics across all users
    pub fn available_topics(&self) -> Vec<String> {
        let topics: BTreeSet<String> = self
            .repo
            .all_topic_stats()
            .into_iter()
            .flat_map(|s| s.stats)
            .map(|s| s.topic)
            .collect();
        topics.into_iter().collect()
    }

    /// Overall accuracy for a user as a rounded percentage, with the raw
    /// correct/total counts. Zero questions yields zero percent.
    pub fn overall_accuracy(&self, user_id: &str) -> (u32, u32, u32) {
        let stats = self.user_topic_stats(user_id);
        let total: u32 = stats.iter().map(|s| s.total_questions).sum();
        let correct: u32 = stats.iter().map(|s| s.correctly_answered).sum();
        let percent = if total > 0 {
            ((correct as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };
        (correct, total, percent)
    }
}
