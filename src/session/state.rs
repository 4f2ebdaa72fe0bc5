//! Refinement session state
//!
//! Keeps the question text of every round next to the answers, so
//! conversation turns never need placeholder questions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    ConversationTurn, FinalRefinementPackage, RefinementRound, RefinementSuggestion, UserAnswer,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} is already finalized")]
    Closed(Uuid),
    #[error("unknown question id '{0}'")]
    UnknownQuestion(String),
    #[error("no answers given")]
    NoAnswers,
}

/// Where a session stands in the dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Questions are out, waiting for the student
    AwaitingAnswers,
    /// A package was produced; terminal
    Done,
}

/// One refinement dialogue, from the first round to its package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementSession {
    pub id: Uuid,
    pub original_query: String,
    pub phase: SessionPhase,
    /// Question rounds the student has answered
    pub rounds_completed: u32,
    /// Every question asked so far, across rounds
    pub asked: Vec<RefinementSuggestion>,
    /// Questions of the latest round
    pub pending: Vec<RefinementSuggestion>,
    pub answers: Vec<UserAnswer>,
    /// Model reasoning of each round, oldest first
    pub reasonings: Vec<String>,
    pub final_package: Option<FinalRefinementPackage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefinementSession {
    /// Open a session for a round that asked questions
    pub fn open(first_round: &RefinementRound) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            original_query: first_round.original_query.clone(),
            phase: SessionPhase::AwaitingAnswers,
            rounds_completed: 0,
            asked: first_round.suggestions.clone(),
            pending: first_round.suggestions.clone(),
            answers: Vec::new(),
            reasonings: vec![first_round.reasoning.clone()],
            final_package: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == SessionPhase::Done
    }

    /// Whether the session sat idle for longer than `ttl`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.updated_at > ttl
    }

    /// Record the answers to the pending round.
    ///
    /// Blank answers are skipped. An answer to an already answered question
    /// replaces the earlier one. Every id must belong to a question this
    /// session asked; nothing is recorded otherwise.
    pub fn accept_answers(&mut self, answers: Vec<UserAnswer>) -> Result<usize, SessionError> {
        if self.is_done() {
            return Err(SessionError::Closed(self.id));
        }
        if let Some(unknown) = answers
            .iter()
            .find(|a| !self.asked.iter().any(|q| q.question_id == a.question_id))
        {
            return Err(SessionError::UnknownQuestion(unknown.question_id.clone()));
        }

        let answers: Vec<UserAnswer> = answers
            .into_iter()
            .filter(|a| !a.answer.trim().is_empty())
            .map(|a| UserAnswer::new(a.question_id, a.answer.trim()))
            .collect();
        if answers.is_empty() {
            return Err(SessionError::NoAnswers);
        }

        let accepted = answers.len();
        for answer in answers {
            if let Some(existing) = self
                .answers
                .iter_mut()
                .find(|a| a.question_id == answer.question_id)
            {
                existing.answer = answer.answer;
            } else {
                self.answers.push(answer);
            }
        }
        self.rounds_completed += 1;
        self.touch();
        Ok(accepted)
    }

    /// Store a further round of questions
    pub fn record_round(&mut self, round: &RefinementRound) {
        self.asked.extend(round.suggestions.iter().cloned());
        self.pending.clone_from(&round.suggestions);
        self.reasonings.push(round.reasoning.clone());
        self.touch();
    }

    /// Close the session with its package
    pub fn finish(&mut self, package: FinalRefinementPackage) {
        self.pending.clear();
        self.final_package = Some(package);
        self.phase = SessionPhase::Done;
        self.touch();
    }

    /// Answers joined with their question text, in answer order
    pub fn turns(&self) -> Vec<ConversationTurn> {
        crate::agents::join_turns(&self.answers, &self.asked)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
