use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("completion response contained no content")]
    EmptyResponse,
}

/// Abstraction over a chat-completion service: text prompt in, text
/// completion out. The completion may be malformed — interpreting it is
/// the caller's problem, not the backend's.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

/// OpenAI-compatible chat backend over HTTP.
pub struct OpenAiCompletion {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiCompletion {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        let base_url: String = base_url.into();
        Ok(OpenAiCompletion {
            client,
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
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
    content: Option<String>,
}

impl CompletionBackend for OpenAiCompletion {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
        });
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        tracing::debug!(prompt_chars = prompt.len(), model = %self.model, "sending completion request");

        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unreadable error body".to_string());
                return Err(CompletionError::Api { status, message });
            }
            let parsed: ChatResponse = response.json().await?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.is_empty())
                .ok_or(CompletionError::EmptyResponse)
        }
    }
}

// ── Test backends ─────────────────────────────────────────────────────────────

/// Returns a pre-set completion — for exercising the enrichment pass
/// without a live API.
pub struct MockCompletion {
    response: String,
}

impl MockCompletion {
    pub fn new(response: impl Into<String>) -> Self {
        MockCompletion { response: response.into() }
    }
}

impl CompletionBackend for MockCompletion {
    fn complete(
        &self,
        _prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send {
        let response = self.response.clone();
        async move { Ok(response) }
    }
}

/// Always fails — for asserting that a pass aborts cleanly, and that
/// zero-work paths never reach the backend at all.
pub struct FailingCompletion;

impl CompletionBackend for FailingCompletion {
    fn complete(
        &self,
        _prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send {
        async move {
            Err(CompletionError::Api { status: 503, message: "backend unavailable".to_string() })
        }
    }
}
