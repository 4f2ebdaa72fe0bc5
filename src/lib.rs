//! Mahaguru - AI study assistant
//!
//! Classifies student queries, answers simple ones directly and runs a short
//! clarifying dialogue for vague learning requests, ending in a refined,
//! structured request package.

// Allow certain clippy warnings that are either stylistic or from external dependencies
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::future_not_send)] // From Rig framework internals, can't fix
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough

pub mod agents;
pub mod assistant;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod domain;
pub mod llm;
pub mod logger;
pub mod providers;
pub mod records;
pub mod session;
pub mod types;
pub mod ui;

// Re-export important structs and functions for easier testing
pub use assistant::{AssistantError, StudyAssistant};
pub use classifier::{QueryClassification, QueryClassifier};
pub use config::Config;
pub use llm::{GatewayError, GenerationRequest, LanguageModelGateway};
pub use providers::{Provider, ProviderConfig};

pub use types::{
    ChatMessage, ChatReply, ContinueReply, ConversationTurn, FinalRefinementPackage,
    RefinementRound, RefinementSuggestion, UserAnswer,
};
