//! deckrag vector crate - slide embeddings and similarity search.
//!
//! Provides an embedding service trait with an OpenAI-compatible HTTP
//! implementation and a deterministic mock, an in-memory slide index with
//! cosine similarity search and JSON snapshots, and [`SlideSearch`], the
//! [`deckrag_core::DocumentStore`] used by the conversation engine.

pub mod embedding;
pub mod index;
pub mod search;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OpenAiEmbedding};
pub use index::{SlideEntry, SlideIndex, SlideText};
pub use search::SlideSearch;
