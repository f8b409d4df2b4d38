//! Conversation state for one session.
//!
//! Holds the ordered turn history and the last question/answer/sources
//! triple. State only changes through [`ConversationState::record_exchange`]
//! and [`ConversationState::reset`], which keeps every update all-or-nothing.

use std::collections::HashSet;

use uuid::Uuid;

use deckrag_core::types::{SourceRef, Turn};

/// Generate a session identifier of the form `session-1a2b3c4d`.
pub fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("session-{}", &hex[..8])
}

/// Mutable state of a single conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    session_id: String,
    turns: Vec<Turn>,
    last_question: Option<String>,
    last_answer: Option<String>,
    last_sources: Option<Vec<SourceRef>>,
}

impl ConversationState {
    /// Start an empty conversation with a fresh session id.
    pub fn new() -> Self {
        Self::with_session_id(new_session_id())
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            last_question: None,
            last_answer: None,
            last_sources: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_question(&self) -> Option<&str> {
        self.last_question.as_deref()
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.last_answer.as_deref()
    }

    pub fn last_sources(&self) -> Option<&[SourceRef]> {
        self.last_sources.as_deref()
    }

    /// True once an answer has been produced in this conversation.
    pub fn has_prior_answer(&self) -> bool {
        self.last_answer.is_some()
    }

    /// Sources cited by assistant turns among the last `window` history entries.
    pub fn recent_sources(&self, window: usize) -> HashSet<SourceRef> {
        let start = self.turns.len().saturating_sub(window);
        self.turns[start..]
            .iter()
            .flat_map(|turn| turn.sources().iter().cloned())
            .collect()
    }

    /// Append a completed user/assistant exchange and update the last fields.
    ///
    /// `question` is the question the answer addresses; `user_text` is what
    /// the user actually typed and is what goes into the history. They only
    /// differ for corrections, which keep answering the earlier question.
    ///
    /// When `max_turns` is set the oldest exchanges are dropped, in whole
    /// pairs, once history grows past it.
    pub fn record_exchange(
        &mut self,
        user_text: &str,
        question: &str,
        answer: &str,
        sources: Vec<SourceRef>,
        max_turns: Option<usize>,
    ) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(answer, sources.clone()));
        self.last_question = Some(question.to_string());
        self.last_answer = Some(answer.to_string());
        self.last_sources = Some(sources);

        if let Some(cap) = max_turns {
            // Round up so a user turn is never separated from its answer.
            let cap = cap + cap % 2;
            if self.turns.len() > cap {
                let excess = self.turns.len() - cap;
                self.turns.drain(..excess);
            }
        }
    }

    /// Forget everything and start over under a new session id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
