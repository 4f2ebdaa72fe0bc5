//! Refinement dialogue types

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Prefix of round-1 question ids (`q_1`, `q_2`, ...)
pub const FIRST_ROUND_PREFIX: &str = "q";
/// Prefix of later-round question ids (`followup_2_1`, ...)
pub const FOLLOW_UP_PREFIX: &str = "followup";

/// A follow-up question asked to clarify a vague query
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RefinementSuggestion {
    /// Unique within its round, and across rounds thanks to the round prefix
    pub question_id: String,
    /// The question itself, e.g. "Are you a beginner?"
    pub text: String,
    /// Category of information the answer adds, e.g. "skill level"
    pub adds: String,
}

/// The caller's answer to a previously asked question
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserAnswer {
    pub question_id: String,
    pub answer: String,
}

impl UserAnswer {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
        }
    }
}

/// Outcome of one refinement round
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RefinementRound {
    pub needs_refinement: bool,
    #[serde(default)]
    pub suggestions: Vec<RefinementSuggestion>,
    pub reasoning: String,
    pub original_query: String,
    /// 1 for the initial round, incremented per continuation
    pub round: u32,
}

impl RefinementRound {
    /// A round that lets the caller proceed without clarification
    pub fn clear(original_query: &str, round: u32, reasoning: impl Into<String>) -> Self {
        Self {
            needs_refinement: false,
            suggestions: Vec::new(),
            reasoning: reasoning.into(),
            original_query: original_query.to_string(),
            round,
        }
    }
}

/// A question joined with its answer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question_id: String,
    pub question: String,
    pub answer: String,
}

/// Question id for the `index`-th (1-based) question of `round`
pub fn question_id(round: u32, index: usize) -> String {
    if round <= 1 {
        format!("{FIRST_ROUND_PREFIX}_{index}")
    } else {
        format!("{FOLLOW_UP_PREFIX}_{round}_{index}")
    }
}

/// Round-trip payload the model is asked to produce for a refinement round
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
pub struct RoundPayload {
    /// Whether clarifying questions should be asked before proceeding
    pub needs_refinement: Option<bool>,
    /// Two or three short clarifying questions
    #[serde(default)]
    pub suggestions: Vec<SuggestionPayload>,
    /// Brief explanation of the decision
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A clarifying question as produced by the model
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
pub struct SuggestionPayload {
    /// The question, under 20 words
    pub text: String,
    /// The missing information category this question covers
    #[serde(default)]
    pub adds: String,
}
