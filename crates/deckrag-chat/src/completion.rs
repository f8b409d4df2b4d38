//! Chat completion client for OpenAI-compatible servers.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use deckrag_core::config::LlmConfig;
use deckrag_core::error::{is_retryable_status, DeckError};
use deckrag_core::traits::CompletionService;
use deckrag_core::types::PromptMessage;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Calls `/v1/chat/completions` and returns the first choice's content.
pub struct OpenAiCompletion {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAiCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompletion")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiCompletion {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, DeckError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeckError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.chat_model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, messages: Vec<PromptMessage>) -> Result<String, DeckError> {
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
        };

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = format!("Completion request failed: {}", e);
                if e.is_connect() || e.is_timeout() {
                    DeckError::Unavailable(message)
                } else {
                    DeckError::Completion(message)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = format!("Completion service error (HTTP {}): {}", status, body);
            return Err(if is_retryable_status(status.as_u16()) {
                DeckError::Unavailable(message)
            } else {
                DeckError::Completion(message)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DeckError::Completion(format!("Completion response: {}", e)))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DeckError::Completion("No choices returned".to_string()))?;

        debug!(model = %self.model, messages = messages.len(), chars = answer.len(), "Completion received");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_base() {
        let config = LlmConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiCompletion::new(&config, "key".to_string()).unwrap();
        assert_eq!(client.url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![
            PromptMessage::system("Tu es un assistant"),
            PromptMessage::user("Bonjour"),
        ];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Bonjour");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Réponse"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Réponse"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = OpenAiCompletion::new(&LlmConfig::default(), "sk-secret".to_string()).unwrap();
        assert!(!format!("{:?}", client).contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = OpenAiCompletion::new(&config, "key".to_string()).unwrap();
        let err = client
            .complete(vec![PromptMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, DeckError::Unavailable(_)));
        assert!(err.is_transient());
    }
}
