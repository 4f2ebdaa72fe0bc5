//! Final refinement package

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConversationTurn;

/// Terminal artifact of a refinement session, ready for downstream consumption
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FinalRefinementPackage {
    pub original_query: String,
    /// The query rewritten to include everything the student told us
    pub refined_query: String,
    pub conversation_history: Vec<ConversationTurn>,
    /// Discrete requirements and constraints
    pub requirements: Vec<String>,
    pub reasoning: String,
    pub refinement_rounds: u32,
    /// Always within `[0.0, 1.0]`
    pub confidence: f32,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Synthesis payload the model is asked to produce
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
pub struct PackagePayload {
    /// The original query rewritten with every answer folded in
    pub refined_query: String,
    /// Discrete, actionable requirements extracted from the dialogue
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Categorization tags such as academic/non-academic and subject areas
    #[serde(default)]
    pub tags: Vec<String>,
    /// Self-reported confidence between 0.7 and 1.0
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Short summary of what the dialogue established
    #[serde(default)]
    pub reasoning: Option<String>,
}
