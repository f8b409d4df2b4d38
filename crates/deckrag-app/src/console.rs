//! Console input parsing and output formatting.
//!
//! Everything here is pure string work so the interactive loop in `main`
//! only moves lines between stdin, the session, and stdout.

use deckrag_chat::{TurnKind, TurnReply};
use deckrag_storage::FeedbackRow;

/// Number of sources listed under an answer.
const LISTED_SOURCES: usize = 3;

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Quit,
    NewConversation,
    Utterance(String),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "quit" | "q" | "exit" => ConsoleInput::Quit,
            "new" => ConsoleInput::NewConversation,
            _ => ConsoleInput::Utterance(trimmed.to_string()),
        }
    }
}

pub const PROMPT: &str = "\n💬 Vous: ";

pub fn banner(session_id: &str) -> String {
    format!(
        "🤖 deckrag - Mode Conversation\n\
         Posez vos questions et guidez-moi avec vos feedbacks naturels\n\n\
         Commandes spéciales:\n  \
         • 'ok' ou 'bien' ou 'parfait' → Confirme que la réponse est bonne\n  \
         • 'new' → Nouvelle conversation\n  \
         • 'quit' → Quitter\n\n\
         Session: {}\n",
        session_id
    )
}

pub fn kind_label(kind: TurnKind) -> &'static str {
    match kind {
        TurnKind::NewTopic => "[Nouvelle question détectée]",
        TurnKind::Continuation => "[Suite de la conversation]",
        TurnKind::Feedback => "[Feedback détecté - Amélioration de la réponse...]",
    }
}

fn satisfaction_prompt(kind: TurnKind) -> &'static str {
    match kind {
        TurnKind::NewTopic => "Satisfait ? Tapez 'ok' pour confirmer ou donnez un feedback pour améliorer",
        TurnKind::Continuation => "Satisfait ? Tapez 'ok' pour confirmer ou continuez à discuter",
        TurnKind::Feedback => "Satisfait ? Tapez 'ok' pour confirmer ou continuez à guider",
    }
}

/// Answer followed by the source count and the first sources.
pub fn render_answer(reply: &TurnReply) -> String {
    let mut out = format!(
        "🤖 Agent: {}\n\n📚 Sources: {} documents\n",
        reply.answer,
        reply.sources.len()
    );
    for (i, source) in reply.sources.iter().take(LISTED_SOURCES).enumerate() {
        out.push_str(&format!(
            "   {}. {} | Slide {}\n",
            i + 1,
            source.file_name(),
            source.slide_index
        ));
    }
    out
}

/// Full transcript block for an answered conversation turn.
pub fn render_turn(reply: &TurnReply) -> String {
    format!(
        "\n{}\n\n{}\n{}",
        kind_label(reply.kind),
        render_answer(reply),
        satisfaction_prompt(reply.kind)
    )
}

pub fn render_confirmation(feedback_id: Option<i64>) -> Option<&'static str> {
    feedback_id.map(|_| "Parfait ! Posez une autre question ou tapez 'quit'")
}

pub fn render_feedback_rows(session_id: &str, rows: &[FeedbackRow]) -> String {
    if rows.is_empty() {
        return format!("Aucun feedback pour {}\n", session_id);
    }
    let mut out = format!("Feedback pour {} ({}):\n", session_id, rows.len());
    for row in rows {
        let record = &row.record;
        out.push_str(&format!(
            "\n#{} [{}] {}\n  Question: {}\n  Feedback: {}\n  Documents: {}\n",
            row.id,
            record.kind.as_str(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.question,
            record.detail,
            record.documents_used.len()
        ));
    }
    out
}
