//! Message and reply envelopes exchanged with the transport layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FinalRefinementPackage, RefinementRound, RefinementSuggestion};
use crate::classifier::QueryClassification;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One prior message of the conversation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// What happened to an inbound message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "response_type", rename_all = "snake_case")]
pub enum ReplyBody {
    /// Answered directly
    DirectResponse {
        bot_message: String,
        source: String,
        classification: QueryClassification,
        /// Present when the query was complex but judged clear in round 1
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refinement_data: Option<RefinementRound>,
    },
    /// Clarifying questions must be answered before the query can be served
    RefinementNeeded {
        session_id: Uuid,
        refinement_data: RefinementRound,
    },
}

/// Reply to an inbound chat message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReply {
    #[serde(flatten)]
    pub body: ReplyBody,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

impl ChatReply {
    pub fn new(body: ReplyBody) -> Self {
        Self {
            body,
            timestamp: Utc::now(),
            success: true,
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match &self.body {
            ReplyBody::RefinementNeeded { session_id, .. } => Some(*session_id),
            ReplyBody::DirectResponse { .. } => None,
        }
    }
}

/// Reply to a continuation: more questions, or the final package
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContinueReply {
    pub needs_refinement: bool,
    #[serde(default)]
    pub suggestions: Vec<RefinementSuggestion>,
    #[serde(default)]
    pub reasoning: String,
    pub original_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_package: Option<FinalRefinementPackage>,
}

impl ContinueReply {
    pub fn more_questions(round: RefinementRound, session_id: Option<Uuid>) -> Self {
        Self {
            needs_refinement: true,
            suggestions: round.suggestions,
            reasoning: round.reasoning,
            original_query: round.original_query,
            session_id,
            final_package: None,
        }
    }

    pub fn finished(package: FinalRefinementPackage, session_id: Option<Uuid>) -> Self {
        Self {
            needs_refinement: false,
            suggestions: Vec::new(),
            reasoning: package.reasoning.clone(),
            original_query: package.original_query.clone(),
            session_id,
            final_package: Some(package),
        }
    }
}
