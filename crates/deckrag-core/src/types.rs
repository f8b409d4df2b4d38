use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Sources and passages
// =============================================================================

/// Pinpoints one slide inside one deck.
///
/// Identity is the `(document_id, slide_index)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRef {
    /// Deck identifier, usually the path the deck was ingested from.
    pub document_id: String,
    /// 1-based slide number within the deck.
    pub slide_index: u32,
}

impl SourceRef {
    pub fn new(document_id: impl Into<String>, slide_index: u32) -> Self {
        Self {
            document_id: document_id.into(),
            slide_index,
        }
    }

    /// The deck's file name with any leading directories stripped.
    pub fn file_name(&self) -> &str {
        self.document_id
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.document_id)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | Slide {}", self.document_id, self.slide_index)
    }
}

/// A slide's text as returned by one retrieval call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub source: SourceRef,
    /// Similarity reported by the store. Informational only.
    #[serde(default)]
    pub score: f64,
}

impl RetrievedPassage {
    pub fn new(text: impl Into<String>, source: SourceRef) -> Self {
        Self {
            text: text.into(),
            source,
            score: 0.0,
        }
    }
}

// =============================================================================
// Conversation turns and prompts
// =============================================================================

/// One entry of a conversation's history.
///
/// Only assistant turns carry the sources they were generated from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        text: String,
        sources: Vec<SourceRef>,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Turn::Assistant {
            text: text.into(),
            sources,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Turn::User { text } | Turn::Assistant { text, .. } => text,
        }
    }

    /// Sources attached to this turn; empty for user turns.
    pub fn sources(&self) -> &[SourceRef] {
        match self {
            Turn::User { .. } => &[],
            Turn::Assistant { sources, .. } => sources,
        }
    }
}

/// Speaker of a prompt message sent to the completion provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// A single message of an assembled prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for PromptMessage {
    fn from(turn: &Turn) -> Self {
        match turn {
            Turn::User { text } => PromptMessage::user(text.clone()),
            Turn::Assistant { text, .. } => PromptMessage::assistant(text.clone()),
        }
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// What the user said about an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// The user confirmed the answer ("ok", "merci", ...).
    Positive,
    /// The user corrected or redirected the answer.
    Correction,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Positive => "positive",
            FeedbackKind::Correction => "correction",
        }
    }
}

impl std::str::FromStr for FeedbackKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "positive" => Ok(FeedbackKind::Positive),
            "correction" => Ok(FeedbackKind::Correction),
            other => Err(format!("unknown feedback kind: {}", other)),
        }
    }
}

/// Append-only record of user feedback on an answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub question: String,
    pub answer: String,
    pub kind: FeedbackKind,
    pub detail: String,
    pub documents_used: Vec<SourceRef>,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}
