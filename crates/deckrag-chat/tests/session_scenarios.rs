//! End-to-end conversation scenarios.
//!
//! Runs a real slide index (mock embeddings) and a real SQLite feedback
//! repository behind the session; only the completion provider is faked.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use deckrag_chat::{
    ChatError, ConversationSession, RetryPolicy, SessionSettings, TurnKind, TurnOutcome, TurnReply,
};
use deckrag_core::config::DeckConfig;
use deckrag_core::error::DeckError;
use deckrag_core::traits::CompletionService;
use deckrag_core::types::{FeedbackKind, PromptMessage, SourceRef};
use deckrag_storage::{Database, FeedbackRepository};
use deckrag_vector::{MockEmbedding, SlideIndex, SlideSearch, SlideText};

// =============================================================================
// Helpers
// =============================================================================

/// Numbered answers; can be switched into failure mode.
#[derive(Default)]
struct ScriptedCompletion {
    calls: Mutex<Vec<Vec<PromptMessage>>>,
    failing: Mutex<bool>,
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, messages: Vec<PromptMessage>) -> Result<String, DeckError> {
        if *self.failing.lock().unwrap() {
            return Err(DeckError::Unavailable("HTTP 503".into()));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(messages);
        Ok(format!("Réponse {}", calls.len()))
    }
}

struct Fixture {
    session: ConversationSession,
    completion: Arc<ScriptedCompletion>,
    feedback: FeedbackRepository,
}

async fn deck_slides(count: u32) -> SlideIndex {
    let slides = (1..=count)
        .map(|i| SlideText {
            document_id: format!("data/deck{}.pptx", (i - 1) / 6 + 1),
            slide_index: i,
            text: format!("Sécurité cloud, point {}", i),
        })
        .collect();
    SlideIndex::build(&MockEmbedding::new(), slides).await.unwrap()
}

async fn fixture(slides: u32) -> Fixture {
    let index = deck_slides(slides).await;
    let store = Arc::new(SlideSearch::new(index, MockEmbedding::new()));
    let completion = Arc::new(ScriptedCompletion::default());
    let feedback = FeedbackRepository::new(Arc::new(Database::in_memory().unwrap()));

    let session = ConversationSession::new(
        &DeckConfig::default(),
        store,
        completion.clone(),
        Arc::new(feedback.clone()),
    )
    .with_settings(SessionSettings {
        retry: RetryPolicy::none(),
        ..SessionSettings::default()
    });

    Fixture {
        session,
        completion,
        feedback,
    }
}

fn answered(outcome: TurnOutcome) -> TurnReply {
    match outcome {
        TurnOutcome::Answered(reply) => reply,
        other => panic!("expected an answer, got {:?}", other),
    }
}

fn source_set(reply: &TurnReply) -> HashSet<SourceRef> {
    reply.sources.iter().cloned().collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_first_question_is_new_topic() {
    let mut f = fixture(12).await;
    let reply = answered(f.session.handle("What is zero-trust architecture?").await.unwrap());

    assert_eq!(reply.kind, TurnKind::NewTopic);
    assert_eq!(reply.sources.len(), 6);
    assert_eq!(reply.answer, "Réponse 1");
    assert_eq!(f.feedback.count().unwrap(), 0);
}

#[tokio::test]
async fn test_follow_up_avoids_sources_just_cited() {
    let mut f = fixture(12).await;
    let first = answered(f.session.handle("What is zero-trust architecture?").await.unwrap());
    let second = answered(
        f.session
            .handle("comment l'implémenter concrètement?")
            .await
            .unwrap(),
    );

    assert_eq!(second.kind, TurnKind::Continuation);
    assert_eq!(second.sources.len(), 6);
    assert!(source_set(&first).is_disjoint(&source_set(&second)));
}

#[tokio::test]
async fn test_fully_excluded_follow_up_reuses_sources() {
    // Six slides only: the follow-up excludes all of them and falls back
    // to the unfiltered ranking.
    let mut f = fixture(6).await;
    let first = answered(f.session.handle("What is zero-trust architecture?").await.unwrap());
    let second = answered(f.session.handle("pourquoi").await.unwrap());
    assert_eq!(source_set(&first), source_set(&second));
}

#[tokio::test]
async fn test_correction_is_persisted_before_new_answer() {
    let mut f = fixture(12).await;
    let first = answered(f.session.handle("What is zero-trust architecture?").await.unwrap());
    let session_id = f.session.session_id().to_string();

    let reply = answered(f.session.handle("non c'est faux, reprends").await.unwrap());
    assert_eq!(reply.kind, TurnKind::Feedback);

    let rows = f.feedback.history_for_session(&session_id, 10).unwrap();
    assert_eq!(rows.len(), 1);
    let record = &rows[0].record;
    assert_eq!(record.kind, FeedbackKind::Correction);
    assert_eq!(record.detail, "non c'est faux, reprends");
    assert_eq!(record.question, "What is zero-trust architecture?");
    assert_eq!(record.answer, "Réponse 1");
    assert_eq!(record.documents_used, first.sources);

    let calls = f.completion.calls.lock().unwrap();
    let last_user = &calls[1].last().unwrap().content;
    assert!(last_user.ends_with(
        "What is zero-trust architecture?\n\nIndication: non c'est faux, reprends"
    ));
}

#[tokio::test]
async fn test_empty_corpus_still_answers() {
    let mut f = fixture(0).await;
    let reply = answered(f.session.handle("What is IAM?").await.unwrap());
    assert!(reply.sources.is_empty());

    let calls = f.completion.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].last().unwrap().content,
        "Contexte des documents:\n\n\nWhat is IAM?"
    );
}

#[tokio::test]
async fn test_confirmation_is_recorded_without_a_new_answer() {
    let mut f = fixture(12).await;
    f.session.handle("What is zero-trust architecture?").await.unwrap();
    let turns_before = f.session.state().turns().to_vec();

    let outcome = f.session.handle("merci").await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Confirmed { feedback_id: Some(_) }));

    let rows = f
        .feedback
        .history_for_session(f.session.session_id(), 10)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.kind, FeedbackKind::Positive);
    assert_eq!(rows[0].record.detail, "merci");
    assert_eq!(f.completion.calls.lock().unwrap().len(), 1);
    assert_eq!(f.session.state().turns(), turns_before.as_slice());
}

#[tokio::test]
async fn test_failed_turn_can_be_resent() {
    let mut f = fixture(12).await;
    f.session.handle("What is zero-trust architecture?").await.unwrap();
    let before = f.session.state().clone();

    *f.completion.failing.lock().unwrap() = true;
    let err = f.session.handle("et si on utilise un VPN").await.unwrap_err();
    assert!(matches!(err, ChatError::Completion(_)));
    assert_eq!(*f.session.state(), before);

    *f.completion.failing.lock().unwrap() = false;
    let reply = answered(f.session.handle("et si on utilise un VPN").await.unwrap());
    assert_eq!(reply.kind, TurnKind::Continuation);
    assert_eq!(f.session.state().turns().len(), 4);
}

#[tokio::test]
async fn test_new_conversation_separates_feedback() {
    let mut f = fixture(12).await;
    f.session.handle("What is zero-trust architecture?").await.unwrap();
    f.session.handle("ok").await.unwrap();
    let first_id = f.session.session_id().to_string();

    f.session.reset();
    f.session.handle("Qu'est-ce que IAM ?").await.unwrap();
    f.session.handle("parfait").await.unwrap();

    assert_eq!(f.feedback.history_for_session(&first_id, 10).unwrap().len(), 1);
    assert_eq!(
        f.feedback
            .history_for_session(f.session.session_id(), 10)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(f.feedback.count().unwrap(), 2);
}
