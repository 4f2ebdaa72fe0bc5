//! Round-1 refinement agent

use std::sync::Arc;

use super::parser::{ParseError, ResponseParser};
use super::{StageError, prompts};
use crate::config::RefinementConfig;
use crate::domain::analyze_domain;
use crate::llm::{GenerationRequest, LanguageModelGateway};
use crate::types::{RefinementRound, RefinementSuggestion, RoundPayload, question_id};
use crate::{log_debug, log_info, log_warn};

/// Reasoning of the safe default round after an unparseable response
pub const PARSE_FAILURE_REASONING: &str = "Unable to parse refinement suggestions";
/// Gateway error messages are cut to this many characters in the safe default reasoning
const TECHNICAL_ERROR_CHARS: usize = 50;

/// Decides whether a query is clear enough and, if not, which questions to ask
pub struct RefinementAgent {
    gateway: Arc<dyn LanguageModelGateway>,
    config: RefinementConfig,
    parser: ResponseParser,
}

impl RefinementAgent {
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, config: RefinementConfig) -> Self {
        Self {
            gateway,
            config,
            parser: ResponseParser::new(),
        }
    }

    /// Run round 1 for `query`. Never fails: any pipeline error yields a clear round.
    pub async fn refine(&self, query: &str) -> RefinementRound {
        match self.try_refine(query).await {
            Ok(round) => {
                log_info!(
                    "Refiner: needs_refinement={} with {} suggestions",
                    round.needs_refinement,
                    round.suggestions.len()
                );
                round
            }
            Err(e) => {
                log_warn!("Refiner: degrading to a clear round: {}", e);
                safe_default_round(query, 1, &e)
            }
        }
    }

    async fn try_refine(&self, query: &str) -> Result<RefinementRound, StageError> {
        let profile = analyze_domain(query);
        log_debug!("Refiner: domain profile {}", profile.hint());

        let prompt = prompts::refinement_prompt(query, &profile, self.config.max_suggestions);
        let request = GenerationRequest::new(prompt)
            .with_temperature(self.config.refine_temperature)
            .with_max_tokens(self.config.refine_max_tokens);

        let raw = self.gateway.generate(&request).await?;
        let payload: RoundPayload = self.parser.parse_json(&raw)?;
        Ok(build_round(payload, query, 1, self.config.max_suggestions)?)
    }
}

/// Validate a parsed payload and number its questions for `round`.
///
/// Suggestions with blank text are dropped and the list is capped at
/// `max_suggestions`; a refinement request left with no questions becomes a clear round.
pub(crate) fn build_round(
    payload: RoundPayload,
    query: &str,
    round: u32,
    max_suggestions: usize,
) -> Result<RefinementRound, ParseError> {
    let needs_refinement = payload
        .needs_refinement
        .ok_or(ParseError::MissingField("needs_refinement"))?;

    let suggestions: Vec<RefinementSuggestion> = if needs_refinement {
        payload
            .suggestions
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .take(max_suggestions)
            .enumerate()
            .map(|(index, s)| RefinementSuggestion {
                question_id: question_id(round, index + 1),
                text: s.text.trim().to_string(),
                adds: s.adds.trim().to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    if needs_refinement && suggestions.is_empty() {
        log_warn!("Refiner: refinement requested without usable questions, treating as clear");
    }

    let reasoning = match payload.reasoning.as_deref().map(str::trim) {
        Some(reasoning) if !reasoning.is_empty() => reasoning.to_string(),
        _ if suggestions.is_empty() => "Query is clear and specific".to_string(),
        _ => "Clarifying questions will make the request more specific".to_string(),
    };

    Ok(RefinementRound {
        needs_refinement: !suggestions.is_empty(),
        suggestions,
        reasoning,
        original_query: query.to_string(),
        round,
    })
}

/// Clear round describing why the pipeline could not produce a real one
pub(crate) fn safe_default_round(query: &str, round: u32, error: &StageError) -> RefinementRound {
    let reasoning = match error {
        StageError::Parse(_) => PARSE_FAILURE_REASONING.to_string(),
        StageError::Gateway(e) => {
            let message: String = e.to_string().chars().take(TECHNICAL_ERROR_CHARS).collect();
            format!("Technical error: {message}")
        }
    };
    RefinementRound::clear(query, round, reasoning)
}
