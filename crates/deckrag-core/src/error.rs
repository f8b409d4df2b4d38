use thiserror::Error;

/// Top-level error type for deckrag.
///
/// Configuration problems are fatal at startup. Retrieval, completion and
/// unavailability failures abort the current turn. Persistence failures are
/// reported but never abort a turn.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Completion error: {0}")]
    Completion(String),

    /// An external service could not be reached, timed out, or answered
    /// with HTTP 429 or 5xx.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DeckError {
    /// Whether a retry of the same external call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeckError::Unavailable(_))
    }
}

/// HTTP statuses worth retrying: rate limiting and server errors.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

impl From<toml::de::Error> for DeckError {
    fn from(err: toml::de::Error) -> Self {
        DeckError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DeckError {
    fn from(err: serde_json::Error) -> Self {
        DeckError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for deckrag operations.
pub type Result<T> = std::result::Result<T, DeckError>;
