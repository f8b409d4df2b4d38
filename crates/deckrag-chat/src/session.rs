//! Conversation session: one user's sequential dialogue over the slides.
//!
//! Routes each utterance by its [`TurnKind`], records feedback, retrieves
//! context with recent sources suppressed, and asks the completion provider
//! for an answer. State is committed only after the answer arrives, so a
//! failed turn can be re-sent without corrupting the conversation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use deckrag_core::config::DeckConfig;
use deckrag_core::traits::{CompletionService, DocumentStore, FeedbackStore};
use deckrag_core::types::{
    FeedbackKind, FeedbackRecord, PromptMessage, RetrievedPassage, SourceRef,
};

use crate::classifier::{TurnClassifier, TurnKind};
use crate::context::ConversationState;
use crate::error::ChatError;
use crate::prompt::{correction_query, PromptBuilder};
use crate::retrieval::RetrievalFilter;
use crate::retry::RetryPolicy;

/// Per-session knobs, usually derived from [`DeckConfig`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub k: usize,
    pub exclusion_window: usize,
    /// Lowercased; matched against the whole trimmed utterance.
    pub confirmation_phrases: Vec<String>,
    pub correction_hint_label: String,
    /// Never below `exclusion_window` once applied.
    pub max_history_turns: Option<usize>,
    pub retry: RetryPolicy,
}

impl SessionSettings {
    pub fn from_config(config: &DeckConfig) -> Self {
        let exclusion_window = config.retrieval.exclusion_window;
        Self {
            k: config.retrieval.k,
            exclusion_window,
            confirmation_phrases: config
                .conversation
                .confirmation_phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            correction_hint_label: config.conversation.correction_hint_label.clone(),
            max_history_turns: config
                .conversation
                .max_history_turns
                .map(|cap| cap.max(exclusion_window)),
            retry: RetryPolicy::from_config(&config.llm),
        }
    }

    fn is_confirmation(&self, utterance: &str) -> bool {
        let lowered = utterance.to_lowercase();
        self.confirmation_phrases.iter().any(|p| *p == lowered)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&DeckConfig::default())
    }
}

/// An answered turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub kind: TurnKind,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub passages: Vec<RetrievedPassage>,
}

/// What happened to an utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Blank input; nothing was done.
    Ignored,
    /// A confirmation phrase. `feedback_id` is set when a positive record
    /// was stored, which requires a previous answer and a working store.
    Confirmed { feedback_id: Option<i64> },
    Answered(TurnReply),
}

/// A single conversation. Turns are processed one at a time through `&mut self`.
pub struct ConversationSession {
    state: ConversationState,
    classifier: TurnClassifier,
    retrieval: RetrievalFilter,
    completion: Arc<dyn CompletionService>,
    feedback: Arc<dyn FeedbackStore>,
    prompt: PromptBuilder,
    settings: SessionSettings,
}

impl ConversationSession {
    pub fn new(
        config: &DeckConfig,
        store: Arc<dyn DocumentStore>,
        completion: Arc<dyn CompletionService>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        let session = Self {
            state: ConversationState::new(),
            classifier: TurnClassifier::new(&config.markers),
            retrieval: RetrievalFilter::new(store),
            completion,
            feedback,
            prompt: PromptBuilder::new(&config.conversation.expertise_domain),
            settings: SessionSettings::from_config(config),
        };
        info!(session_id = %session.session_id(), "Conversation started");
        session
    }

    /// Replace the derived settings, e.g. to disable retries in tests.
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn session_id(&self) -> &str {
        self.state.session_id()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Process one utterance.
    ///
    /// On error the conversation state is left untouched. A correction
    /// record written before the failure is kept.
    pub async fn handle(&mut self, utterance: &str) -> Result<TurnOutcome, ChatError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        if self.settings.is_confirmation(utterance) {
            let feedback_id = self.confirm(utterance).await;
            return Ok(TurnOutcome::Confirmed { feedback_id });
        }

        let kind = self
            .classifier
            .classify(utterance, self.state.has_prior_answer());
        debug!(session_id = %self.session_id(), kind = kind.as_str(), "Utterance classified");

        let reply = self.answer(utterance, kind).await?;
        Ok(TurnOutcome::Answered(reply))
    }

    /// Answer a single question with no history and nothing recorded.
    pub async fn ask_once(&self, question: &str) -> Result<TurnReply, ChatError> {
        let passages = self
            .retrieve(question.trim(), &HashSet::new())
            .await?;
        let messages = self.prompt.build(&[], &passages, question.trim());
        let answer = self.complete(messages).await?;
        Ok(TurnReply {
            kind: TurnKind::NewTopic,
            sources: passages.iter().map(|p| p.source.clone()).collect(),
            answer,
            passages,
        })
    }

    /// Start over with empty history and a new session id.
    pub fn reset(&mut self) {
        let previous = self.state.session_id().to_string();
        self.state.reset();
        info!(previous = %previous, session_id = %self.session_id(), "Conversation reset");
    }

    async fn confirm(&self, phrase: &str) -> Option<i64> {
        let (Some(question), Some(answer)) = (self.state.last_question(), self.state.last_answer())
        else {
            debug!(session_id = %self.session_id(), "Confirmation without an answer, ignored");
            return None;
        };
        self.record_feedback(FeedbackKind::Positive, question, answer, phrase)
            .await
    }

    async fn answer(&mut self, utterance: &str, kind: TurnKind) -> Result<TurnReply, ChatError> {
        let (query, question, exclude) = match kind {
            TurnKind::NewTopic => (utterance.to_string(), utterance.to_string(), HashSet::new()),
            TurnKind::Continuation => (
                utterance.to_string(),
                utterance.to_string(),
                self.state.recent_sources(self.settings.exclusion_window),
            ),
            TurnKind::Feedback => {
                let last_question = self.state.last_question().unwrap_or_default().to_string();
                if let Some(answer) = self.state.last_answer() {
                    self.record_feedback(FeedbackKind::Correction, &last_question, answer, utterance)
                        .await;
                }
                (
                    correction_query(
                        &last_question,
                        utterance,
                        &self.settings.correction_hint_label,
                    ),
                    last_question,
                    self.state.recent_sources(self.settings.exclusion_window),
                )
            }
        };

        let passages = self.retrieve(&query, &exclude).await?;
        let messages = self.prompt.build(self.state.turns(), &passages, &query);
        let answer = self.complete(messages).await?;

        let sources: Vec<SourceRef> = passages.iter().map(|p| p.source.clone()).collect();
        self.state.record_exchange(
            utterance,
            &question,
            &answer,
            sources.clone(),
            self.settings.max_history_turns,
        );

        info!(
            session_id = %self.session_id(),
            kind = kind.as_str(),
            excluded = exclude.len(),
            sources = sources.len(),
            "Turn answered"
        );

        Ok(TurnReply {
            kind,
            answer,
            sources,
            passages,
        })
    }

    async fn retrieve(
        &self,
        query: &str,
        exclude: &HashSet<SourceRef>,
    ) -> Result<Vec<RetrievedPassage>, ChatError> {
        let k = self.settings.k;
        let passages = self
            .settings
            .retry
            .run("retrieval", || self.retrieval.retrieve(query, exclude, k))
            .await
            .map_err(ChatError::retrieval)?;
        Ok(passages)
    }

    async fn complete(&self, messages: Vec<PromptMessage>) -> Result<String, ChatError> {
        let answer = self
            .settings
            .retry
            .run("completion", || self.completion.complete(messages.clone()))
            .await
            .map_err(ChatError::completion)?;

        if answer.trim().is_empty() {
            return Err(ChatError::Completion("empty answer".to_string()));
        }
        Ok(answer)
    }

    /// Persist a feedback record. Failures are logged and never fail the turn.
    async fn record_feedback(
        &self,
        kind: FeedbackKind,
        question: &str,
        answer: &str,
        detail: &str,
    ) -> Option<i64> {
        let record = FeedbackRecord {
            question: question.to_string(),
            answer: answer.to_string(),
            kind,
            detail: detail.to_string(),
            documents_used: self.state.last_sources().map(<[_]>::to_vec).unwrap_or_default(),
            timestamp: Utc::now(),
            session_id: self.session_id().to_string(),
        };

        match self.feedback.append(&record).await {
            Ok(id) => {
                info!(session_id = %record.session_id, kind = kind.as_str(), id, "Feedback recorded");
                Some(id)
            }
            Err(e) => {
                warn!(session_id = %record.session_id, kind = kind.as_str(), error = %e, "Failed to record feedback");
                None
            }
        }
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
