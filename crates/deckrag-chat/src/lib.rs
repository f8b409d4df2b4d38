//! Conversational engine for deckrag.
//!
//! Classifies each utterance as a new topic, a continuation, or feedback on
//! the previous answer, retrieves slides while suppressing sources cited in
//! recent turns, and drives the completion provider for one session.

pub mod classifier;
pub mod completion;
pub mod context;
pub mod error;
pub mod prompt;
pub mod retrieval;
pub mod retry;
pub mod session;

pub use classifier::{TurnClassifier, TurnKind};
pub use completion::OpenAiCompletion;
pub use context::ConversationState;
pub use error::ChatError;
pub use prompt::PromptBuilder;
pub use retrieval::RetrievalFilter;
pub use retry::RetryPolicy;
pub use session::{ConversationSession, SessionSettings, TurnOutcome, TurnReply};
