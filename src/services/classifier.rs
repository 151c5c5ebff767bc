//! Response Classifier
//!
//! Detects the two contracts embedded in model output text: the leading
//! `[TOPIC: <name>]` tag and the fixed completion-phrase set. Pattern
//! matching against free-form model text is inherently fragile, so it is
//! isolated here; the session state machine only consumes the results.

use regex::Regex;

/// Phrases whose presence (case-insensitive) marks a problem as solved.
/// The set is part of the gateway contract; do not extend casually.
const COMPLETION_PHRASES: &[&str] = &[
    "congratulations",
    "you've solved",
    "excellent work",
    "problem is complete",
    "successfully solved",
];

/// Classifier for assistant response text.
pub struct ResponseClassifier {
    topic_tag: Regex,
}

impl ResponseClassifier {
    /// Create a classifier
    pub fn new() -> Self {
        Self {
            // The tag body is free text up to the closing bracket.
            topic_tag: Regex::new(r"\[TOPIC:\s*([^\]]+)\]").expect("valid topic tag pattern"),
        }
    }

    /// Extract the first `[TOPIC: <name>]` tag from `text`, trimmed.
    pub fn detect_topic(&self, text: &str) -> Option<String> {
        self.topic_tag
            .captures(text)?
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Whether `text` contains any completion phrase.
    pub fn is_completion(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        COMPLETION_PHRASES.iter().any(|p| lower.contains(p))
    }
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new()
    }
}
