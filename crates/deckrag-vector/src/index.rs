//! In-memory slide index with brute-force cosine similarity search.
//!
//! Slide decks are small (a few hundred slides), so an O(n) scan per query
//! is fast enough. The index is persisted as a JSON snapshot; extracting
//! text from the decks happens upstream of this crate.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use deckrag_core::error::{DeckError, Result};
use deckrag_core::types::{RetrievedPassage, SourceRef};

use crate::embedding::DynEmbeddingService;

/// Extracted slide text, the input of [`SlideIndex::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideText {
    pub document_id: String,
    pub slide_index: u32,
    pub text: String,
}

/// A slide stored in the index together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    pub document_id: String,
    pub slide_index: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl SlideEntry {
    fn source(&self) -> SourceRef {
        SourceRef::new(self.document_id.clone(), self.slide_index)
    }
}

/// Thread-safe in-memory index of slide embeddings.
///
/// Insertion order is kept so ties in similarity resolve deterministically.
#[derive(Debug, Clone, Default)]
pub struct SlideIndex {
    entries: Arc<RwLock<Vec<SlideEntry>>>,
}

impl SlideIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed every slide and collect the results into a new index.
    ///
    /// Slides with blank text are skipped.
    pub async fn build(
        embedder: &dyn DynEmbeddingService,
        slides: Vec<SlideText>,
    ) -> Result<Self> {
        let index = Self::new();
        let total = slides.len();
        for slide in slides {
            if slide.text.trim().is_empty() {
                continue;
            }
            let embedding = embedder.embed_boxed(&slide.text).await?;
            index.insert(SlideEntry {
                document_id: slide.document_id,
                slide_index: slide.slide_index,
                text: slide.text,
                embedding,
            })?;
        }
        info!(slides = total, indexed = index.len(), "Slide index built");
        Ok(index)
    }

    /// Insert a slide, replacing any entry with the same source.
    ///
    /// All embeddings in one index share a dimension; a differing entry is
    /// rejected.
    pub fn insert(&self, entry: SlideEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DeckError::Retrieval(format!("Lock poisoned: {}", e)))?;
        if let Some(dims) = entries.first().map(|e| e.embedding.len()) {
            if entry.embedding.len() != dims {
                return Err(DeckError::Retrieval(format!(
                    "embedding dimension mismatch: slide {}, index {}",
                    entry.embedding.len(),
                    dims
                )));
            }
        }
        match entries
            .iter_mut()
            .find(|e| e.document_id == entry.document_id && e.slide_index == entry.slide_index)
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Return the `k` slides most similar to `query`, best first.
    ///
    /// Fails when `query` does not have the dimension of the stored
    /// embeddings, since every score would be meaningless.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedPassage>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DeckError::Retrieval(format!("Lock poisoned: {}", e)))?;

        if let Some(dims) = entries.first().map(|e| e.embedding.len()) {
            if query.len() != dims {
                return Err(DeckError::Retrieval(format!(
                    "embedding dimension mismatch: query {}, index {}",
                    query.len(),
                    dims
                )));
            }
        }

        let mut scored: Vec<(f64, &SlideEntry)> = entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| RetrievedPassage {
                text: entry.text.clone(),
                source: entry.source(),
                score,
            })
            .collect())
    }

    /// Load a snapshot written by [`SlideIndex::save_snapshot`].
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<SlideEntry> = serde_json::from_str(&content)?;
        info!(path = %path.display(), slides = entries.len(), "Slide index loaded");
        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Write every entry to `path` as a JSON array.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries = self
            .entries
            .read()
            .map_err(|e| DeckError::Retrieval(format!("Lock poisoned: {}", e)))?;
        let content = serde_json::to_string(&*entries)?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), slides = entries.len(), "Slide index saved");
        Ok(())
    }

    /// Return the number of slides currently stored in the index.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Return true if the index contains no slides.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of the stored embeddings, `None` while the index is empty.
    pub fn dimensions(&self) -> Option<usize> {
        self.entries
            .read()
            .ok()
            .and_then(|e| e.first().map(|entry| entry.embedding.len()))
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedding;

    fn entry(doc: &str, slide: u32, embedding: Vec<f32>) -> SlideEntry {
        SlideEntry {
            document_id: doc.to_string(),
            slide_index: slide,
            text: format!("{} slide {}", doc, slide),
            embedding,
        }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = SlideIndex::new();
        index.insert(entry("far.pptx", 1, vec![0.0, 1.0])).unwrap();
        index.insert(entry("near.pptx", 1, vec![1.0, 0.1])).unwrap();
        index.insert(entry("exact.pptx", 1, vec![1.0, 0.0])).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let docs: Vec<&str> = hits.iter().map(|h| h.source.document_id.as_str()).collect();
        assert_eq!(docs, vec!["exact.pptx", "near.pptx", "far.pptx"]);
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let index = SlideIndex::new();
        for i in 1..=5 {
            index.insert(entry("deck.pptx", i, vec![1.0, i as f32])).unwrap();
        }
        assert_eq!(index.search(&[1.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 50).unwrap().len(), 5);
    }

    #[test]
    fn test_search_empty_index() {
        let index = SlideIndex::new();
        assert!(index.search(&[1.0, 0.0], 10).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = SlideIndex::new();
        index.insert(entry("a.pptx", 1, vec![1.0, 0.0])).unwrap();
        index.insert(entry("b.pptx", 1, vec![1.0, 0.0])).unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].source.document_id, "a.pptx");
        assert_eq!(hits[1].source.document_id, "b.pptx");
    }

    #[test]
    fn test_insert_replaces_same_source() {
        let index = SlideIndex::new();
        index.insert(entry("deck.pptx", 3, vec![1.0, 0.0])).unwrap();
        let mut updated = entry("deck.pptx", 3, vec![0.0, 1.0]);
        updated.text = "updated".to_string();
        index.insert(updated).unwrap();

        assert_eq!(index.len(), 1);
        let hits = index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].text, "updated");
    }

    #[test]
    fn test_search_rejects_query_of_other_dimension() {
        let index = SlideIndex::new();
        index.insert(entry("deck.pptx", 1, vec![0.0, 1.0, 0.0])).unwrap();
        index.insert(entry("deck.pptx", 2, vec![1.0, 0.0, 0.0])).unwrap();

        let err = index.search(&[1.0, 0.0], 2).unwrap_err();
        assert!(matches!(err, DeckError::Retrieval(_)));
        assert!(err.to_string().contains("query 2, index 3"));
    }

    #[test]
    fn test_insert_rejects_other_dimension() {
        let index = SlideIndex::new();
        index.insert(entry("deck.pptx", 1, vec![1.0, 0.0])).unwrap();
        assert!(index.insert(entry("deck.pptx", 2, vec![1.0, 0.0, 0.0])).is_err());
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimensions(), Some(2));
    }

    #[test]
    fn test_empty_index_has_no_dimension() {
        assert_eq!(SlideIndex::new().dimensions(), None);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index").join("slides.json");

        let index = SlideIndex::new();
        index.insert(entry("data/deck1.pptx", 4, vec![0.5, 0.5])).unwrap();
        index.insert(entry("data/deck2.pptx", 1, vec![1.0, 0.0])).unwrap();
        index.save_snapshot(&path).unwrap();

        let loaded = SlideIndex::load_snapshot(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let hits = loaded.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].source, SourceRef::new("data/deck2.pptx", 1));
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let result = SlideIndex::load_snapshot(Path::new("/nonexistent/slides.json"));
        assert!(matches!(result, Err(DeckError::Io(_))));
    }

    #[tokio::test]
    async fn test_build_skips_blank_slides() {
        let slides = vec![
            SlideText {
                document_id: "deck.pptx".to_string(),
                slide_index: 1,
                text: "Zero trust: never trust, always verify".to_string(),
            },
            SlideText {
                document_id: "deck.pptx".to_string(),
                slide_index: 2,
                text: "   ".to_string(),
            },
        ];
        let index = SlideIndex::build(&MockEmbedding::new(), slides).await.unwrap();
        assert_eq!(index.len(), 1);
    }
}
