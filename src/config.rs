//! Service configuration loaded from environment variables.
//!
//! | Variable                   | Default                                   |
//! |----------------------------|-------------------------------------------|
//! | `HOST`                     | `0.0.0.0`                                 |
//! | `PORT`                     | `8001`                                    |
//! | `LLM_CLIENT_ID`            | client credentials, exchanged for tokens  |
//! | `LLM_CLIENT_SECRET`        | (both or neither)                         |
//! | `LLM_API_KEY`              | static bearer key, used without the above |
//! | `LLM_SCOPE`                | `GIGACHAT_API_PERS`                       |
//! | `LLM_AUTH_URL`             | GigaChat OAuth endpoint                   |
//! | `LLM_API_URL`              | GigaChat chat-completions endpoint        |
//! | `LLM_MODEL`                | `GigaChat`                                |
//! | `LLM_TIMEOUT_SECS`         | `60`                                      |
//! | `LLM_MAX_RETRIES`          | `0`                                       |
//! | `LLM_ACCEPT_INVALID_CERTS` | `false`                                   |
//!
//! One of the two credential forms is required; client credentials win when
//! both are set.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::{BearerAuth, ChatOptions, OAuthCredentials};

pub const DEFAULT_LLM_API_URL: &str =
    "https://gigachat.devices.sberbank.ru/api/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "GigaChat";
pub const DEFAULT_LLM_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const DEFAULT_LLM_SCOPE: &str = "GIGACHAT_API_PERS";

const CREDENTIAL_VARS: &str = "LLM_CLIENT_ID/LLM_CLIENT_SECRET or LLM_API_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Model connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub auth: BearerAuth,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub accept_invalid_certs: bool,
}

/// Sampling settings for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentTuning {
    pub temperature: f64,
    pub max_tokens: u64,
}

impl AgentTuning {
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions::new(self.temperature, self.max_tokens)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub llm: LlmSettings,
    pub planning: AgentTuning,
    pub finance: AgentTuning,
    pub intent: AgentTuning,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let auth = match (var("LLM_CLIENT_ID"), var("LLM_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => BearerAuth::OAuth(OAuthCredentials {
                auth_url: var("LLM_AUTH_URL").unwrap_or_else(|| DEFAULT_LLM_AUTH_URL.to_string()),
                client_id,
                client_secret,
                scope: var("LLM_SCOPE").unwrap_or_else(|| DEFAULT_LLM_SCOPE.to_string()),
            }),
            (Some(_), None) => return Err(ConfigError::Missing("LLM_CLIENT_SECRET")),
            (None, Some(_)) => return Err(ConfigError::Missing("LLM_CLIENT_ID")),
            (None, None) => BearerAuth::ApiKey(
                var("LLM_API_KEY").ok_or(ConfigError::Missing(CREDENTIAL_VARS))?,
            ),
        };
        let timeout_secs: u64 = parse_or("LLM_TIMEOUT_SECS", var("LLM_TIMEOUT_SECS"), 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "LLM_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", var("PORT"), 8001)?,
            llm: LlmSettings {
                api_url: var("LLM_API_URL").unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
                auth,
                model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
                max_retries: parse_or("LLM_MAX_RETRIES", var("LLM_MAX_RETRIES"), 0)?,
                accept_invalid_certs: parse_or(
                    "LLM_ACCEPT_INVALID_CERTS",
                    var("LLM_ACCEPT_INVALID_CERTS"),
                    false,
                )?,
            },
            planning: AgentTuning {
                temperature: 0.5,
                max_tokens: 3000,
            },
            finance: AgentTuning {
                temperature: 0.3,
                max_tokens: 2000,
            },
            intent: AgentTuning {
                temperature: 0.5,
                max_tokens: 16,
            },
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
        },
    }
}
