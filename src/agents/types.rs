//! Agent identity and error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of an agent instance (for log correlation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Planning,
    Finance,
    Maestro,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Finance => "finance",
            Self::Maestro => "maestro",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors an agent surfaces to its caller.
///
/// Model quality problems never show up here; they are absorbed into
/// repaired, partial or fallback results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model API rejected our credentials or scope. Every further request
    /// would fail the same way, so this is reported instead of masked.
    #[error(
        "LLM API authentication failed (403 Forbidden) in {agent} agent. \
         Check LLM_CLIENT_ID/LLM_CLIENT_SECRET (or LLM_API_KEY): they must be valid, \
         unexpired and granted the scope set in LLM_SCOPE. Provider response: {reason}"
    )]
    Auth { agent: AgentType, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_names_credential() {
        let err = AgentError::Auth {
            agent: AgentType::Finance,
            reason: "Client error (403): Forbidden".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("LLM_API_KEY"));
        assert!(message.contains("LLM_SCOPE"));
        assert!(message.contains("finance agent"));
        assert!(message.contains("Client error (403)"));
    }

    #[test]
    fn test_agent_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgentType::Planning).unwrap(),
            "\"planning\""
        );
        assert_ne!(AgentId::new(), AgentId::new());
    }
}
