//! Shared configuration, error, and domain types for deckrag.
//!
//! Also defines the adapter traits the conversation engine talks to:
//! [`DocumentStore`], [`CompletionService`], and [`FeedbackStore`].

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DeckConfig;
pub use error::{DeckError, Result};
pub use traits::{CompletionService, DocumentStore, FeedbackStore};
pub use types::*;
