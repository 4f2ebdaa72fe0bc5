//! Rounds after the first: ask again, or finalize

use std::sync::Arc;

use super::finalizer::PackageFinalizer;
use super::parser::ResponseParser;
use super::refiner::build_round;
use super::{StageError, prompts};
use crate::config::RefinementConfig;
use crate::llm::{GenerationRequest, LanguageModelGateway};
use crate::types::{
    ConversationTurn, FinalRefinementPackage, RefinementRound, RefinementSuggestion, RoundPayload,
    UserAnswer,
};
use crate::{log_debug, log_info, log_warn};

/// Result of a continuation call
#[derive(Debug, Clone, PartialEq)]
pub enum ContinuationOutcome {
    /// The dialogue needs another round of answers
    MoreQuestions(RefinementRound),
    /// The dialogue is over
    Finalized(FinalRefinementPackage),
}

impl ContinuationOutcome {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }
}

/// Drives rounds 2+ of the refinement dialogue under a hard round cap
pub struct RefinementContinuation {
    gateway: Arc<dyn LanguageModelGateway>,
    finalizer: PackageFinalizer,
    config: RefinementConfig,
    parser: ResponseParser,
}

impl RefinementContinuation {
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, config: RefinementConfig) -> Self {
        Self {
            finalizer: PackageFinalizer::new(Arc::clone(&gateway), config.clone()),
            gateway,
            config,
            parser: ResponseParser::new(),
        }
    }

    /// Continue from bare answers.
    ///
    /// Question text is recovered from `asked` when available; otherwise a
    /// placeholder naming the question id stands in.
    pub async fn continue_refinement(
        &self,
        original_query: &str,
        answers: &[UserAnswer],
        asked: &[RefinementSuggestion],
        rounds_completed: u32,
    ) -> ContinuationOutcome {
        let turns = join_turns(answers, asked);
        self.continue_with_turns(original_query, turns, rounds_completed, &[])
            .await
    }

    /// Continue from fully joined turns.
    ///
    /// `rounds_completed` counts the question rounds already answered. Once it
    /// reaches `max_rounds` no model call is made and the package is produced
    /// directly and records `max_rounds`; a round that lands on the cap may
    /// not ask again.
    pub async fn continue_with_turns(
        &self,
        original_query: &str,
        turns: Vec<ConversationTurn>,
        rounds_completed: u32,
        prior_reasonings: &[String],
    ) -> ContinuationOutcome {
        let max_rounds = self.config.max_rounds;
        let round = rounds_completed.saturating_add(1);

        if rounds_completed >= max_rounds {
            log_info!(
                "Continuation: {} rounds completed, cap of {} reached, forcing finalization",
                rounds_completed,
                max_rounds
            );
            let reasoning = combine_reasoning(prior_reasonings, None);
            return self
                .finalize(original_query, turns, &reasoning, max_rounds)
                .await;
        }

        let decision = self.ask_model(original_query, &turns, round).await;
        let reasoning = match decision {
            Ok(next) if next.needs_refinement && round < max_rounds => {
                log_info!(
                    "Continuation: round {} asks {} more questions",
                    round,
                    next.suggestions.len()
                );
                return ContinuationOutcome::MoreQuestions(next);
            }
            Ok(next) => {
                if next.needs_refinement {
                    log_info!("Continuation: round {} is the last allowed, forcing finalization", round);
                } else {
                    log_info!("Continuation: enough context gathered in round {}", round);
                }
                combine_reasoning(prior_reasonings, Some(&next.reasoning))
            }
            Err(e) => {
                log_warn!("Continuation: finalizing after failure: {}", e);
                combine_reasoning(prior_reasonings, None)
            }
        };

        self.finalize(original_query, turns, &reasoning, round).await
    }

    async fn ask_model(
        &self,
        original_query: &str,
        turns: &[ConversationTurn],
        round: u32,
    ) -> Result<RefinementRound, StageError> {
        let prompt = prompts::continuation_prompt(
            original_query,
            turns,
            round,
            self.config.max_rounds,
            self.config.max_suggestions,
        );
        log_debug!("Continuation: round {} prompt of {} chars", round, prompt.len());
        let request = GenerationRequest::new(prompt)
            .with_temperature(self.config.refine_temperature)
            .with_max_tokens(self.config.refine_max_tokens);

        let raw = self.gateway.generate(&request).await?;
        let payload: RoundPayload = self.parser.parse_json(&raw)?;
        Ok(build_round(
            payload,
            original_query,
            round,
            self.config.max_suggestions,
        )?)
    }

    async fn finalize(
        &self,
        original_query: &str,
        turns: Vec<ConversationTurn>,
        reasoning: &str,
        rounds: u32,
    ) -> ContinuationOutcome {
        ContinuationOutcome::Finalized(
            self.finalizer
                .finalize(original_query, turns, reasoning, rounds)
                .await,
        )
    }
}

/// Pair answers with the questions they reply to, in answer order
pub fn join_turns(answers: &[UserAnswer], asked: &[RefinementSuggestion]) -> Vec<ConversationTurn> {
    answers
        .iter()
        .map(|answer| ConversationTurn {
            question_id: answer.question_id.clone(),
            question: asked
                .iter()
                .find(|s| s.question_id == answer.question_id)
                .map_or_else(
                    || format!("Question {}", answer.question_id),
                    |s| s.text.clone(),
                ),
            answer: answer.answer.clone(),
        })
        .collect()
}

fn combine_reasoning(prior: &[String], latest: Option<&str>) -> String {
    prior
        .iter()
        .map(String::as_str)
        .chain(latest)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
