use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DeckError, Result};

/// Top-level configuration for deckrag.
///
/// Loaded from `~/.deckrag/config.toml` by default. Every section falls back
/// to its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

impl DeckConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DeckConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the feedback database and slide index snapshot.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.deckrag/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages handed to the model per turn. Twice as many are fetched.
    pub k: usize,
    /// Number of most recent history entries whose sources are suppressed.
    pub exclusion_window: usize,
    /// Slide index snapshot file, relative to `data_dir` unless absolute.
    pub index_file: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 6,
            exclusion_window: 6,
            index_file: "slides.json".to_string(),
        }
    }
}

/// OpenAI-compatible model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL; `/v1/chat/completions` and `/v1/embeddings` are appended.
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub temperature: f32,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Extra attempts after a transient retrieval or completion failure.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            temperature: 0.0,
            timeout_secs: 60,
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// A missing or blank key is a configuration error.
    pub fn resolve_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(DeckError::Config(format!(
                "{} is not set",
                self.api_key_env
            ))),
        }
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Domain the assistant presents itself as an expert in.
    pub expertise_domain: String,
    /// Utterances recorded as positive feedback instead of being answered.
    pub confirmation_phrases: Vec<String>,
    /// Label joining the previous question and a correction.
    pub correction_hint_label: String,
    /// Optional cap on stored history entries. Never below the exclusion window.
    pub max_history_turns: Option<usize>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            expertise_domain: "cybersécurité, cloud computing et IA générative".to_string(),
            confirmation_phrases: ["ok", "bien", "parfait", "good", "great", "merci", "thanks"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            correction_hint_label: "Indication".to_string(),
            max_history_turns: None,
        }
    }
}

/// Keyword lists driving turn classification.
///
/// Matching is done against the lowercased utterance, so entries should be
/// lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Substrings that signal a change of subject.
    pub new_topic: Vec<String>,
    /// Substrings that signal a follow-up on the current subject.
    pub continuation: Vec<String>,
    /// Prefixes that signal a correction of the previous answer.
    pub feedback: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|s| s.to_string()).collect();
        Self {
            new_topic: owned(&[
                "maintenant",
                "passons à",
                "autre chose",
                "changer de sujet",
                "nouvelle question",
                "autre question",
                "parlons de",
            ]),
            continuation: owned(&[
                "comment",
                "pourquoi",
                "et si",
                "mais",
                "donc",
                "alors",
                "concrètement",
                "pratiquement",
                "en détail",
                "précise",
                "exemple",
                "plus d'info",
                "développe",
                "continue",
                "ensuite",
                "après",
                "du coup",
            ]),
            feedback: owned(&[
                "non",
                "pas bon",
                "incorrect",
                "faux",
                "erreur",
                "mieux",
                "améliore",
                "change",
                "refais",
                "plutôt",
            ]),
        }
    }
}

/// Feedback persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// SQLite file, relative to `data_dir` unless absolute.
    pub db_file: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            db_file: "feedback.db".to_string(),
        }
    }
}
