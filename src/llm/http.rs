//! OpenAI-compatible chat-completions client (GigaChat, OpenRouter, vLLM, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::auth::{BearerAuth, TokenProvider};
use super::error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};

/// Chat-completions client over HTTP with bearer authentication.
pub struct HttpChatClient {
    client: Client,
    api_url: String,
    credentials: Credentials,
    retry_config: RetryConfig,
}

enum Credentials {
    Static(String),
    Exchanged(TokenProvider),
}

impl HttpChatClient {
    /// Create a client with a per-request timeout and no retries.
    ///
    /// `accept_invalid_certs` is for endpoints signed by a CA outside the
    /// system store.
    pub fn new(
        api_url: String,
        auth: BearerAuth,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        let credentials = match auth {
            BearerAuth::ApiKey(key) => Credentials::Static(key),
            BearerAuth::OAuth(oauth) => {
                Credentials::Exchanged(TokenProvider::new(client.clone(), oauth))
            }
        };
        Ok(Self {
            client,
            api_url,
            credentials,
            retry_config: RetryConfig::default(),
        })
    }

    /// Use a custom retry policy for transient errors.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Parse Retry-After header if present.
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok().map(Duration::from_secs))
    }

    async fn bearer_token(&self) -> Result<String, LlmError> {
        match &self.credentials {
            Credentials::Static(key) => Ok(key.clone()),
            Credentials::Exchanged(provider) => provider.token().await,
        }
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                if let Credentials::Exchanged(provider) = &self.credentials {
                    provider.invalidate().await;
                }
            }
            return Err(status_error(status, &body, retry_after));
        }

        parse_chat_response(&body, &request.model)
    }

    /// Execute a request, retrying transient errors while the policy allows.
    async fn execute_with_retry(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.execute_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Request succeeded after {} retries (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => {
                    let remaining = self
                        .retry_config
                        .max_retry_duration
                        .saturating_sub(start.elapsed());
                    let delay = error.suggested_delay(attempt).min(remaining);

                    if self.retry_config.should_retry(&error)
                        && attempt < self.retry_config.max_retries
                        && !delay.is_zero()
                    {
                        tracing::warn!(
                            "Retry attempt {} failed with {}, retrying in {:?}: {}",
                            attempt + 1,
                            error.kind,
                            delay,
                            error.message
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::debug!(
                        "Giving up after {} attempt(s) in {:?}",
                        attempt + 1,
                        start.elapsed()
                    );
                    return Err(anyhow::anyhow!("{}", error));
                }
            }
        }
    }
}

/// Create an LlmError from HTTP response status and body.
pub(super) fn status_error(
    status: reqwest::StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> LlmError {
    let status_code = status.as_u16();
    // Keep the reason phrase ("Forbidden") next to the body for auth detection.
    let message = match status.canonical_reason() {
        Some(reason) if !body.contains(reason) => format!("{} {}", reason, body),
        _ => body.to_string(),
    };

    match classify_http_status(status_code) {
        LlmErrorKind::RateLimited => LlmError::rate_limited(message, retry_after),
        LlmErrorKind::ClientError => LlmError::client_error(status_code, message),
        _ => LlmError::server_error(status_code, message),
    }
}

pub(super) fn transport_error(e: reqwest::Error) -> LlmError {
    let what = if e.is_timeout() {
        "Request timeout"
    } else if e.is_connect() {
        "Connection failed"
    } else {
        "Request failed"
    };
    LlmError::network_error(format!("{}: {}", what, e))
}

#[async_trait]
impl LlmClient for HttpChatClient {
    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
        };

        tracing::debug!("Sending chat completion to {}: model={}", self.api_url, model);

        self.execute_with_retry(&request).await
    }
}

/// Decode a successful chat-completions body.
fn parse_chat_response(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let parsed: ChatCompletionBody = serde_json::from_str(body).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

    Ok(ChatResponse {
        content: choice.message.content,
        finish_reason: choice.finish_reason,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        model: parsed.model.or_else(|| Some(requested_model.to_string())),
    })
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionBody {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Usage data (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_for_both_credential_forms() {
        let key = HttpChatClient::new(
            "http://127.0.0.1:9/chat".to_string(),
            BearerAuth::ApiKey("secret".to_string()),
            Duration::from_secs(5),
            false,
        )
        .unwrap()
        .with_retry_config(RetryConfig::with_max_retries(2));
        assert!(matches!(key.credentials, Credentials::Static(ref k) if k == "secret"));
        assert_eq!(key.retry_config.max_retries, 2);

        let oauth = HttpChatClient::new(
            "http://127.0.0.1:9/chat".to_string(),
            BearerAuth::OAuth(crate::llm::OAuthCredentials {
                auth_url: "http://127.0.0.1:9/oauth".to_string(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                scope: "GIGACHAT_API_PERS".to_string(),
            }),
            Duration::from_secs(5),
            true,
        )
        .unwrap();
        assert!(matches!(oauth.credentials, Credentials::Exchanged(_)));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"items\": []}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150},
            "model": "GigaChat:1.0.26"
        }"#;
        let response = parse_chat_response(body, "GigaChat").unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"items\": []}"));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 150);
        assert_eq!(response.model.as_deref(), Some("GigaChat:1.0.26"));
    }

    #[test]
    fn test_parse_chat_response_without_choices() {
        let err = parse_chat_response(r#"{"choices": []}"#, "GigaChat").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }

    #[test]
    fn test_forbidden_reason_kept_in_message() {
        let err = status_error(reqwest::StatusCode::FORBIDDEN, "{\"status\":403}", None);
        assert_eq!(err.kind, LlmErrorKind::ClientError);
        assert!(err.to_string().contains("Forbidden"));
        assert!(crate::llm::is_auth_failure(&err.to_string()));
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest {
            model: "GigaChat".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: Some(0.5),
            top_p: None,
            max_tokens: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["temperature"], 0.5);
        assert!(value.get("top_p").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
