//! Adapter traits for the external collaborators of a conversation.
//!
//! The conversation engine only ever sees these traits; concrete adapters
//! live in `deckrag-vector` (slide search), `deckrag-chat` (completion client),
//! and `deckrag-storage` (feedback persistence). All implementations must be
//! safe to share between independent sessions.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FeedbackRecord, PromptMessage, RetrievedPassage};

/// Similarity search over the slide corpus.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return up to `k` passages for `query`, best match first.
    ///
    /// An empty corpus yields an empty vector, not an error.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>>;
}

/// Chat completion provider.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send the whole message sequence and return the full generated answer.
    async fn complete(&self, messages: Vec<PromptMessage>) -> Result<String>;
}

/// Append-only sink for feedback records.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persist a record and return its row id.
    async fn append(&self, record: &FeedbackRecord) -> Result<i64>;
}
