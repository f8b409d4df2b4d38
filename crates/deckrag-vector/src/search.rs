//! Slide search: query embedding plus index lookup.

use async_trait::async_trait;
use tracing::debug;

use deckrag_core::error::{DeckError, Result};
use deckrag_core::traits::DocumentStore;
use deckrag_core::types::RetrievedPassage;

use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::index::SlideIndex;

/// [`DocumentStore`] over a [`SlideIndex`].
///
/// Uses dynamic dispatch so production code can supply `OpenAiEmbedding`
/// while tests use `MockEmbedding`.
pub struct SlideSearch {
    index: SlideIndex,
    embedder: Box<dyn DynEmbeddingService>,
}

impl SlideSearch {
    pub fn new(index: SlideIndex, embedder: impl EmbeddingService + 'static) -> Self {
        Self {
            index,
            embedder: Box::new(embedder),
        }
    }

    /// Check that the embedder produces vectors of the index's dimension.
    ///
    /// A snapshot built with another embedding model fails here instead of
    /// ranking every slide at zero.
    pub fn verify_dimensions(&self) -> Result<()> {
        match self.index.dimensions() {
            Some(indexed) if indexed != self.embedder.dimensions() => Err(DeckError::Config(format!(
                "slide index holds {}-dimensional embeddings but the embedder produces {}; rebuild it with `deckrag index`",
                indexed,
                self.embedder.dimensions()
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for SlideSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_boxed(query).await?;
        let hits = self.index.search(&query_vec, k)?;
        debug!(k, hits = hits.len(), "Slide search");
        Ok(hits)
    }
}
