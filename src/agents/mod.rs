//! Agents of the study assistant
//!
//! Each agent runs one short pipeline: build prompt, call the gateway once,
//! extract, parse. Failures never leave an agent; they become safe defaults.

pub mod answer;
pub mod continuation;
pub mod finalizer;
pub mod parser;
pub mod prompts;
pub mod refiner;

pub use answer::{DirectAnswer, DirectAnswerer};
pub use continuation::{ContinuationOutcome, RefinementContinuation, join_turns};
pub use finalizer::PackageFinalizer;
pub use parser::{ParseError, ResponseParser};
pub use refiner::RefinementAgent;

use crate::llm::GatewayError;

/// Failure inside an agent pipeline, before degradation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
