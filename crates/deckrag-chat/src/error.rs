//! Error types for the conversational engine.

use deckrag_core::error::DeckError;

/// Errors that fail a conversation turn, by the stage that failed.
///
/// A failed turn leaves the session state exactly as it was, so the same
/// utterance can be sent again.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("completion failed: {0}")]
    Completion(String),
}

impl ChatError {
    /// Failure while retrieving context for the turn.
    pub fn retrieval(err: DeckError) -> Self {
        ChatError::Retrieval(detail(err))
    }

    /// Failure while generating the answer.
    pub fn completion(err: DeckError) -> Self {
        ChatError::Completion(detail(err))
    }
}

/// Message of a stage error without repeating the stage name.
fn detail(err: DeckError) -> String {
    match err {
        DeckError::Retrieval(msg) | DeckError::Completion(msg) => msg,
        other => other.to_string(),
    }
}
