//! Refinement sessions
//!
//! A session remembers which questions were asked so continuation can join
//! answers with their questions, and enforces that each dialogue yields at
//! most one package.

mod state;
mod storage;

pub use state::{RefinementSession, SessionError, SessionPhase};
pub use storage::{FileSessionStore, InMemorySessionStore, SessionStore};
