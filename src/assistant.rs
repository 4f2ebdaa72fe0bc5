//! Study assistant orchestration
//!
//! Routes a message to the direct-answer path or the refinement dialogue and
//! drives the dialogue to a package. Only input validation and session
//! bookkeeping surface as errors; every model failure has already been
//! absorbed by the agents.

use chrono::Duration;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::agents::{
    ContinuationOutcome, DirectAnswer, DirectAnswerer, RefinementAgent, RefinementContinuation,
};
use crate::classifier::{QueryClassification, QueryClassifier};
use crate::config::Config;
use crate::llm::{LanguageModelGateway, build_fast_gateway, build_gateway};
use crate::records::{JsonlRecordLog, RecordSink, RefinementRecord};
use crate::session::{
    FileSessionStore, InMemorySessionStore, RefinementSession, SessionError, SessionStore,
};
use crate::types::{
    ChatMessage, ChatReply, ContinueReply, FinalRefinementPackage, RefinementRound, ReplyBody,
    UserAnswer,
};
use crate::{log_debug, log_info, log_warn};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("session {0} not found or expired")]
    SessionNotFound(Uuid),
    #[error("session {0} is already finalized")]
    SessionClosed(Uuid),
    #[error("session {0} is being continued by another request")]
    SessionBusy(Uuid),
    #[error("unknown question id '{0}'")]
    UnknownQuestion(String),
    #[error("session storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AssistantError {
    /// Whether the caller, not the system, is at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl From<SessionError> for AssistantError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Closed(id) => Self::SessionClosed(id),
            SessionError::UnknownQuestion(id) => Self::UnknownQuestion(id),
            SessionError::NoAnswers => Self::InvalidInput("at least one non-empty answer is required".to_string()),
        }
    }
}

/// Front door of the crate: classify, answer, refine and continue
pub struct StudyAssistant {
    classifier: QueryClassifier,
    refiner: RefinementAgent,
    continuation: RefinementContinuation,
    answerer: DirectAnswerer,
    sessions: Arc<dyn SessionStore>,
    records: Option<Arc<dyn RecordSink>>,
    in_flight: Mutex<HashSet<Uuid>>,
    max_query_chars: usize,
    session_ttl: Duration,
}

impl StudyAssistant {
    /// Assistant over a single `gateway` with in-memory sessions and no record log
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, config: &Config) -> Self {
        Self::with_gateways(Arc::clone(&gateway), gateway, config)
    }

    /// Like [`Self::new`], with a separate gateway for the refinement rounds
    pub fn with_gateways(
        answer_gateway: Arc<dyn LanguageModelGateway>,
        refine_gateway: Arc<dyn LanguageModelGateway>,
        config: &Config,
    ) -> Self {
        Self {
            classifier: QueryClassifier::new(),
            refiner: RefinementAgent::new(Arc::clone(&refine_gateway), config.refinement.clone()),
            continuation: RefinementContinuation::new(refine_gateway, config.refinement.clone()),
            answerer: DirectAnswerer::new(answer_gateway, config.answer.clone()),
            sessions: Arc::new(InMemorySessionStore::new()),
            records: None,
            in_flight: Mutex::new(HashSet::new()),
            max_query_chars: config.runtime.max_query_chars,
            session_ttl: config.runtime.session_ttl(),
        }
    }

    /// Assistant wired entirely from `config`: gateway, session store and record log
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut assistant =
            Self::with_gateways(build_gateway(config)?, build_fast_gateway(config)?, config);
        if let Some(dir) = &config.runtime.sessions_dir {
            assistant = assistant.with_session_store(Arc::new(FileSessionStore::new(dir)?));
        }
        if let Some(path) = &config.runtime.records_file {
            assistant = assistant.with_record_sink(Arc::new(JsonlRecordLog::new(path)?));
        }
        Ok(assistant)
    }

    #[must_use]
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    #[must_use]
    pub fn with_record_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.records = Some(sink);
        self
    }

    pub fn classify(&self, query: &str) -> QueryClassification {
        self.classifier.classify(query)
    }

    /// Round 1 only
    pub async fn refine(&self, query: &str) -> Result<RefinementRound, AssistantError> {
        let query = self.validate_query(query)?;
        Ok(self.refiner.refine(query).await)
    }

    pub async fn direct_answer(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<DirectAnswer, AssistantError> {
        let query = self.validate_query(query)?;
        Ok(self.answerer.answer(query, history).await)
    }

    /// Handle one inbound chat message
    pub async fn handle_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, AssistantError> {
        let query = self.validate_query(message)?;
        let classification = self.classifier.classify(query);
        log_info!("Assistant: query classified as {}", classification);

        if classification == QueryClassification::Simple {
            let answer = self.answerer.answer(query, history).await;
            return Ok(ChatReply::new(ReplyBody::DirectResponse {
                bot_message: answer.text,
                source: answer.source,
                classification,
                refinement_data: None,
            }));
        }

        let round = self.refiner.refine(query).await;
        if !round.needs_refinement {
            log_debug!("Assistant: query is clear, answering directly");
            let answer = self.answerer.answer(query, history).await;
            return Ok(ChatReply::new(ReplyBody::DirectResponse {
                bot_message: answer.text,
                source: answer.source,
                classification,
                refinement_data: Some(round),
            }));
        }

        self.purge_expired();
        let session = RefinementSession::open(&round);
        self.sessions.save(&session)?;
        log_info!(
            "Assistant: session {} opened with {} questions",
            session.id,
            round.suggestions.len()
        );
        Ok(ChatReply::new(ReplyBody::RefinementNeeded {
            session_id: session.id,
            refinement_data: round,
        }))
    }

    /// Feed answers into a session; returns more questions or the package
    pub async fn continue_session(
        &self,
        session_id: Uuid,
        answers: Vec<UserAnswer>,
    ) -> Result<ContinueReply, AssistantError> {
        let _claim = SessionClaim::acquire(&self.in_flight, session_id)?;
        self.purge_expired();

        let mut session = self
            .sessions
            .load(session_id)?
            .ok_or(AssistantError::SessionNotFound(session_id))?;
        if session.is_done() {
            return Err(AssistantError::SessionClosed(session_id));
        }
        session.accept_answers(answers)?;

        let outcome = self
            .continuation
            .continue_with_turns(
                &session.original_query,
                session.turns(),
                session.rounds_completed,
                &session.reasonings,
            )
            .await;

        match outcome {
            ContinuationOutcome::MoreQuestions(round) => {
                session.record_round(&round);
                self.sessions.save(&session)?;
                Ok(ContinueReply::more_questions(round, Some(session_id)))
            }
            ContinuationOutcome::Finalized(package) => {
                session.finish(package.clone());
                self.sessions.save(&session)?;
                log_info!("Assistant: session {} finalized", session_id);
                self.record(&package, Some(session_id));
                Ok(ContinueReply::finished(package, Some(session_id)))
            }
        }
    }

    /// Stateless continuation: the caller echoes the query, answers and round count
    pub async fn continue_refinement(
        &self,
        original_query: &str,
        answers: &[UserAnswer],
        rounds_completed: u32,
    ) -> Result<ContinueReply, AssistantError> {
        let query = self.validate_query(original_query)?;
        if rounds_completed == 0 {
            return Err(AssistantError::InvalidInput(
                "rounds_completed must count at least the answered first round".to_string(),
            ));
        }
        let answers: Vec<UserAnswer> = answers
            .iter()
            .filter(|a| !a.answer.trim().is_empty())
            .cloned()
            .collect();

        match self
            .continuation
            .continue_refinement(query, &answers, &[], rounds_completed)
            .await
        {
            ContinuationOutcome::MoreQuestions(round) => Ok(ContinueReply::more_questions(round, None)),
            ContinuationOutcome::Finalized(package) => {
                self.record(&package, None);
                Ok(ContinueReply::finished(package, None))
            }
        }
    }

    /// Current state of a session
    pub fn session(&self, session_id: Uuid) -> Result<RefinementSession, AssistantError> {
        self.sessions
            .load(session_id)?
            .ok_or(AssistantError::SessionNotFound(session_id))
    }

    fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str, AssistantError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }
        let length = query.chars().count();
        if length > self.max_query_chars {
            return Err(AssistantError::InvalidInput(format!(
                "query is {length} characters, the limit is {}",
                self.max_query_chars
            )));
        }
        Ok(query)
    }

    fn purge_expired(&self) {
        match self.sessions.purge_expired(self.session_ttl) {
            Ok(0) => {}
            Ok(purged) => log_debug!("Assistant: purged {} expired sessions", purged),
            Err(e) => log_warn!("Assistant: failed to purge expired sessions: {}", e),
        }
    }

    fn record(&self, package: &FinalRefinementPackage, session_id: Option<Uuid>) {
        if let Some(sink) = &self.records
            && let Err(e) = sink.append(&RefinementRecord::from_package(package, session_id))
        {
            log_warn!("Assistant: failed to append refinement record: {}", e);
        }
    }
}

/// Marks a session as being continued; released on drop
struct SessionClaim<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> SessionClaim<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<Uuid>>, id: Uuid) -> Result<Self, AssistantError> {
        if in_flight.lock().insert(id) {
            Ok(Self { in_flight, id })
        } else {
            Err(AssistantError::SessionBusy(id))
        }
    }
}

impl Drop for SessionClaim<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.id);
    }
}
