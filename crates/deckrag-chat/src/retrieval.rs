//! Retrieval with suppression of recently cited sources.
//!
//! Fetches twice the requested number of candidates from the
//! [`DocumentStore`], drops those whose source appears in the exclusion set,
//! and keeps the first `k` survivors. When every candidate is excluded the
//! unfiltered top `k` is used instead, so a turn never goes without context
//! just because the conversation already covered the best slides.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use deckrag_core::error::DeckError;
use deckrag_core::traits::DocumentStore;
use deckrag_core::types::{RetrievedPassage, SourceRef};

/// Multiplier applied to `k` when fetching candidates.
const CANDIDATE_FACTOR: usize = 2;

#[derive(Clone)]
pub struct RetrievalFilter {
    store: Arc<dyn DocumentStore>,
}

impl RetrievalFilter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Retrieve up to `k` passages for `query`, skipping excluded sources.
    ///
    /// Store order is preserved. The result is never empty when the store
    /// returned anything and `k > 0`.
    pub async fn retrieve(
        &self,
        query: &str,
        exclude: &HashSet<SourceRef>,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, DeckError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut candidates = self.store.search(query, k * CANDIDATE_FACTOR).await?;
        let fetched = candidates.len();

        let fresh: Vec<RetrievedPassage> = candidates
            .iter()
            .filter(|p| !exclude.contains(&p.source))
            .take(k)
            .cloned()
            .collect();

        let passages = if fresh.is_empty() {
            if fetched > 0 {
                debug!(fetched, excluded = exclude.len(), "All candidates excluded, using unfiltered results");
            }
            candidates.truncate(k);
            candidates
        } else {
            fresh
        };

        debug!(
            fetched,
            kept = passages.len(),
            excluded = exclude.len(),
            top_score = ?passages.first().map(|p| p.score),
            "Retrieved passages"
        );
        Ok(passages)
    }
}

impl std::fmt::Debug for RetrievalFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalFilter").finish_non_exhaustive()
    }
}
