//! Bearer credentials for the chat endpoint.
//!
//! GigaChat does not accept the client credentials directly. They are traded
//! at an OAuth endpoint for an access token that lives about half an hour; the
//! token is cached and fetched again shortly before it expires.

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::LlmError;
use super::http::{status_error, transport_error};

/// Refetch this long before the provider's expiry.
const REFRESH_MARGIN_MS: i64 = 60_000;

/// Lifetime assumed when the provider reports none.
const DEFAULT_LIFETIME_MS: i64 = 30 * 60 * 1000;

/// Client-credentials exchange settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

/// How the chat endpoint is authorised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerAuth {
    /// A long-lived key sent as the bearer token as-is.
    ApiKey(String),
    /// Client credentials traded for short-lived access tokens.
    OAuth(OAuthCredentials),
}

/// An access token and its expiry (unix epoch, milliseconds).
#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms + REFRESH_MARGIN_MS < self.expires_at
    }
}

/// OAuth token response. GigaChat sends `expires_at` in epoch milliseconds;
/// generic providers send `expires_in` seconds.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached(self, now_ms: i64) -> CachedToken {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => at,
            (None, Some(secs)) => now_ms + secs * 1000,
            (None, None) => now_ms + DEFAULT_LIFETIME_MS,
        };
        CachedToken {
            value: self.access_token,
            expires_at,
        }
    }
}

/// Exchanges client credentials for access tokens and caches them.
pub struct TokenProvider {
    client: Client,
    credentials: OAuthCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(client: Client, credentials: OAuthCredentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// A token valid for at least the refresh margin.
    pub async fn token(&self) -> Result<String, LlmError> {
        let mut cached = self.cached.lock().await;
        let now_ms = chrono::Utc::now().timestamp_millis();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now_ms)) {
            return Ok(token.value.clone());
        }

        let token = self.fetch(now_ms).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token, e.g. after the chat endpoint rejected it.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self, now_ms: i64) -> Result<CachedToken, LlmError> {
        tracing::debug!(
            "Requesting access token from {} (scope {})",
            self.credentials.auth_url,
            self.credentials.scope
        );

        let response = self
            .client
            .post(&self.credentials.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .form(&[("scope", self.credentials.scope.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error(
                status,
                &format!("OAuth token exchange failed: {}", body),
                None,
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse token response: {}", e))
        })?;
        let token = parsed.into_cached(now_ms);
        tracing::info!(
            "Obtained access token (valid for {}s)",
            (token.expires_at - now_ms) / 1000
        );
        Ok(token)
    }
}
