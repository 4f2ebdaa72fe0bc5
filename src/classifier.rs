//! Rule-based query triage
//!
//! Decides whether a message takes the direct-answer path or the refinement path.
//! Matching is case-insensitive substring search, first match wins:
//!
//! 1. any learning-intent phrase → [`QueryClassification::Complex`]
//! 2. any greeting phrase → [`QueryClassification::Simple`]
//! 3. fewer than [`SHORT_QUERY_WORDS`] words → [`QueryClassification::Simple`]
//! 4. otherwise → [`QueryClassification::Complex`]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Queries below this word count without intent keywords are answered directly
pub const SHORT_QUERY_WORDS: usize = 5;

/// Phrases signalling that the student wants to learn something substantial
pub const LEARNING_KEYWORDS: &[&str] = &[
    "learn",
    "teach me",
    "explain",
    "understand",
    "study",
    "roadmap",
    "course",
    "tutorial",
    "prepare for",
    "master",
    "guide me",
    "help me with",
    "how do i",
    "how to",
    "syllabus",
    "exam",
];

/// Conversational phrases that need no refinement
pub const GREETING_KEYWORDS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "thanks",
    "thank you",
    "good morning",
    "good afternoon",
    "good evening",
    "bye",
    "how are you",
];

/// Which path a query takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryClassification {
    /// Answered directly by the language model
    Simple,
    /// Routed through the refinement dialogue
    Complex,
}

impl fmt::Display for QueryClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// Deterministic keyword/length classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, query: &str) -> QueryClassification {
        let lowered = query.to_lowercase();

        if contains_any(&lowered, LEARNING_KEYWORDS) {
            QueryClassification::Complex
        } else if contains_any(&lowered, GREETING_KEYWORDS)
            || lowered.split_whitespace().count() < SHORT_QUERY_WORDS
        {
            QueryClassification::Simple
        } else {
            QueryClassification::Complex
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
