//! Final package synthesis

use chrono::Utc;
use std::sync::Arc;

use super::parser::ResponseParser;
use super::{StageError, prompts};
use crate::config::RefinementConfig;
use crate::domain::analyze_domain;
use crate::llm::{GenerationRequest, LanguageModelGateway};
use crate::types::{ConversationTurn, FinalRefinementPackage, PackagePayload};
use crate::{log_debug, log_info, log_warn};

const FALLBACK_REASONING: &str = "Synthesis unavailable, the original query is used as-is";

/// Turns a finished refinement dialogue into a [`FinalRefinementPackage`]
pub struct PackageFinalizer {
    gateway: Arc<dyn LanguageModelGateway>,
    config: RefinementConfig,
    parser: ResponseParser,
}

impl PackageFinalizer {
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, config: RefinementConfig) -> Self {
        Self {
            gateway,
            config,
            parser: ResponseParser::new(),
        }
    }

    /// Synthesize the package. Never fails: a broken synthesis echoes the original query.
    pub async fn finalize(
        &self,
        original_query: &str,
        conversation_history: Vec<ConversationTurn>,
        reasoning: &str,
        rounds_completed: u32,
    ) -> FinalRefinementPackage {
        log_debug!(
            "Finalizer: synthesizing from {} turns after {} rounds",
            conversation_history.len(),
            rounds_completed
        );

        match self
            .synthesize(original_query, &conversation_history, reasoning)
            .await
        {
            Ok(payload) => {
                log_info!("Finalizer: package synthesized");
                self.package_from(payload, original_query, conversation_history, reasoning, rounds_completed)
            }
            Err(e) => {
                log_warn!("Finalizer: falling back to the original query: {}", e);
                self.fallback_package(original_query, conversation_history, reasoning, rounds_completed)
            }
        }
    }

    async fn synthesize(
        &self,
        original_query: &str,
        turns: &[ConversationTurn],
        reasoning: &str,
    ) -> Result<PackagePayload, StageError> {
        let prompt = prompts::finalization_prompt(original_query, turns, reasoning);
        let request = GenerationRequest::new(prompt)
            .with_temperature(self.config.finalize_temperature)
            .with_max_tokens(self.config.finalize_max_tokens);

        let raw = self.gateway.generate(&request).await?;
        let payload: PackagePayload = self.parser.parse_json(&raw)?;
        if payload.refined_query.trim().is_empty() {
            return Err(super::parser::ParseError::MissingField("refined_query").into());
        }
        Ok(payload)
    }

    fn package_from(
        &self,
        payload: PackagePayload,
        original_query: &str,
        conversation_history: Vec<ConversationTurn>,
        reasoning: &str,
        rounds_completed: u32,
    ) -> FinalRefinementPackage {
        let tags = clean_list(payload.tags);
        let tags = if tags.is_empty() {
            vec![analyze_domain(original_query).domain.tag().to_string()]
        } else {
            tags
        };
        let reasoning = payload
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| reasoning.to_string());

        FinalRefinementPackage {
            original_query: original_query.to_string(),
            refined_query: payload.refined_query.trim().to_string(),
            conversation_history,
            requirements: clean_list(payload.requirements),
            reasoning,
            refinement_rounds: rounds_completed,
            confidence: self.clamp_confidence(payload.confidence),
            tags,
            timestamp: Utc::now(),
        }
    }

    fn fallback_package(
        &self,
        original_query: &str,
        conversation_history: Vec<ConversationTurn>,
        reasoning: &str,
        rounds_completed: u32,
    ) -> FinalRefinementPackage {
        let reasoning = if reasoning.trim().is_empty() {
            FALLBACK_REASONING.to_string()
        } else {
            reasoning.to_string()
        };
        FinalRefinementPackage {
            original_query: original_query.to_string(),
            refined_query: original_query.to_string(),
            conversation_history,
            requirements: Vec::new(),
            reasoning,
            refinement_rounds: rounds_completed,
            confidence: self.config.default_confidence,
            tags: vec![analyze_domain(original_query).domain.tag().to_string()],
            timestamp: Utc::now(),
        }
    }

    fn clamp_confidence(&self, confidence: Option<f32>) -> f32 {
        match confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => self.config.default_confidence,
        }
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
