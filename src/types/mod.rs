//! Data model of the study assistant
//!
//! - Refinement dialogue: suggestions, answers, rounds, turns
//! - The final refinement package
//! - Chat envelopes handed to the transport layer

mod chat;
mod package;
mod refinement;

pub use chat::{ChatMessage, ChatReply, ChatRole, ContinueReply, ReplyBody};
pub use package::{FinalRefinementPackage, PackagePayload};
pub use refinement::{
    ConversationTurn, FIRST_ROUND_PREFIX, FOLLOW_UP_PREFIX, RefinementRound,
    RefinementSuggestion, RoundPayload, SuggestionPayload, UserAnswer, question_id,
};
