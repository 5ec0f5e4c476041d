//! LLM client module for interacting with language models.
//!
//! Two layers live here:
//! - [`LlmClient`]: chat-completion transport (the HTTP implementation is
//!   [`HttpChatClient`])
//! - [`TextCompletion`]: the narrow prompt-in, text-out contract the agent
//!   pipelines depend on. [`ModelHandle`] adapts the former to the latter.
//!
//! Bearer credentials are either a static key or client credentials exchanged
//! for short-lived tokens ([`TokenProvider`]).

mod auth;
mod error;
mod http;

pub use auth::{BearerAuth, OAuthCredentials, TokenProvider};
pub use error::{
    classify_http_status, is_auth_failure, LlmError, LlmErrorKind, RetryConfig,
    AUTH_FAILURE_MARKERS,
};
pub use http::HttpChatClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Optional parameters for chat completions.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: Option<f64>,
    /// Top-p nucleus sampling.
    pub top_p: Option<f64>,
    /// Maximum output tokens to generate.
    pub max_tokens: Option<u64>,
}

impl ChatOptions {
    pub fn new(temperature: f64, max_tokens: u64) -> Self {
        Self {
            temperature: Some(temperature),
            top_p: None,
            max_tokens: Some(max_tokens),
        }
    }
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request with optional parameters.
    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse>;
}

/// A single rendered prompt in, raw model text out.
///
/// Implementations make exactly one call per invocation. The returned text is
/// never assumed to be well-formed: it may be empty, fenced, or cut off.
/// Failures carry the provider's reason in their message.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Binds a client, a model id and sampling options into a [`TextCompletion`].
#[derive(Clone)]
pub struct ModelHandle {
    llm: Arc<dyn LlmClient>,
    model: String,
    options: ChatOptions,
}

impl ModelHandle {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, options: ChatOptions) -> Self {
        Self {
            llm,
            model: model.into(),
            options,
        }
    }
}

#[async_trait]
impl TextCompletion for ModelHandle {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let messages = [ChatMessage::user(prompt)];
        let response = self
            .llm
            .chat_completion_with_options(&self.model, &messages, self.options.clone())
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "Completion from {}: {} prompt + {} completion tokens (finish_reason={:?})",
                response.model.as_deref().unwrap_or(&self.model),
                usage.prompt_tokens,
                usage.completion_tokens,
                response.finish_reason
            );
        }
        if response.finish_reason.as_deref() == Some("length") {
            tracing::warn!("Model {} stopped at max_tokens; response is truncated", self.model);
        }

        Ok(response.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingClient {
        seen: Mutex<Vec<(String, Vec<ChatMessage>, Option<f64>)>>,
        content: Option<String>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn chat_completion_with_options(
            &self,
            model: &str,
            messages: &[ChatMessage],
            options: ChatOptions,
        ) -> anyhow::Result<ChatResponse> {
            self.seen.lock().unwrap().push((
                model.to_string(),
                messages.to_vec(),
                options.temperature,
            ));
            Ok(ChatResponse {
                content: self.content.clone(),
                finish_reason: Some("stop".to_string()),
                usage: Some(TokenUsage::new(10, 5)),
                model: None,
            })
        }
    }

    #[tokio::test]
    async fn test_model_handle_sends_single_user_message() {
        let client = Arc::new(RecordingClient {
            seen: Mutex::new(Vec::new()),
            content: Some("{\"ok\": true}".to_string()),
        });
        let handle = ModelHandle::new(client.clone(), "GigaChat", ChatOptions::new(0.3, 2000));

        let text = handle.complete("hello").await.unwrap();
        assert_eq!(text, "{\"ok\": true}");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "GigaChat");
        assert_eq!(seen[0].1.len(), 1);
        assert_eq!(seen[0].1[0].role, Role::User);
        assert_eq!(seen[0].1[0].content, "hello");
        assert_eq!(seen[0].2, Some(0.3));
    }

    #[tokio::test]
    async fn test_missing_content_becomes_empty_text() {
        let client = Arc::new(RecordingClient {
            seen: Mutex::new(Vec::new()),
            content: None,
        });
        let handle = ModelHandle::new(client, "GigaChat", ChatOptions::default());
        assert_eq!(handle.complete("hello").await.unwrap(), "");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(u64::MAX, 1);
        assert_eq!(usage.total_tokens, u64::MAX);
    }
}
