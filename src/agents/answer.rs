//! Direct-answer path for simple queries and already-clear requests

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::prompts;
use crate::config::AnswerConfig;
use crate::llm::{GatewayError, GenerationRequest, LanguageModelGateway};
use crate::types::ChatMessage;
use crate::{log_debug, log_warn};

pub const EMPTY_RESPONSE_FALLBACK: &str = "I apologize, but I couldn't generate a proper response. Could you please rephrase your question?";
pub const PROVIDER_ERROR_FALLBACK: &str = "I'm experiencing some technical difficulties right now. Please try again in a moment, or rephrase your question.";

/// Text handed back to the student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectAnswer {
    pub text: String,
    /// Label of the model that produced the answer
    pub source: String,
    /// True when `text` is a canned apology rather than generated output
    pub fallback: bool,
}

/// Answers a query in the classroom mentor persona
pub struct DirectAnswerer {
    gateway: Arc<dyn LanguageModelGateway>,
    config: AnswerConfig,
}

impl DirectAnswerer {
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, config: AnswerConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn answer(&self, query: &str, history: &[ChatMessage]) -> DirectAnswer {
        let window_start = history.len().saturating_sub(self.config.history_window);
        let window = &history[window_start..];
        log_debug!(
            "Answerer: replaying {} of {} history messages",
            window.len(),
            history.len()
        );

        let request = GenerationRequest::new(prompts::direct_answer_prompt(query, window))
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        let source = self.gateway.model_label();

        match self.gateway.generate(&request).await {
            Ok(text) => DirectAnswer {
                text: text.trim().to_string(),
                source,
                fallback: false,
            },
            Err(e) => {
                log_warn!("Answerer: returning canned reply: {}", e);
                let text = match e {
                    GatewayError::EmptyResponse => EMPTY_RESPONSE_FALLBACK,
                    GatewayError::ProviderError(_) => PROVIDER_ERROR_FALLBACK,
                };
                DirectAnswer {
                    text: text.to_string(),
                    source,
                    fallback: true,
                }
            }
        }
    }
}
