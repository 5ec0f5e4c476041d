//! Agents module - prompt-templated pipelines over the model.
//!
//! # Agent Types
//! - **PlanningAgent**: timeline, preparation tasks and critical path
//! - **FinanceAgent**: budget breakdown reconciled against the ceiling
//! - **Maestro**: classifies a free-text request and routes it to the above
//!
//! # Pipeline
//! ```text
//! render prompt ─► call model ─┬─ auth failure ─────────────► AgentError::Auth
//!                              ├─ transport failure / empty ─► fallback
//!                              └─ text ─► extract ─► parse ─► [repair] ─► [partial]
//!                                                     │
//!                                                     └─ nothing usable ─► fallback
//! ```
//! The model is called at most once per run.

mod context;
mod finance;
mod maestro;
mod planning;
pub mod prompts;
mod types;

pub use context::AgentContext;
pub use finance::{decorate_budget, interpret_budget, FinanceAgent};
pub use maestro::{
    classify_by_keywords, Intent, Maestro, MaestroRequest, MaestroResponse, MaestroResults,
};
pub use planning::{fallback_plan, EventPlan, PlanTask, PlanningAgent, TimelinePhase};
pub use types::{AgentError, AgentId, AgentType};

use async_trait::async_trait;

use crate::event::EventRequest;
use crate::llm::{is_auth_failure, TextCompletion};
use crate::recovery::ParseOutcome;

/// Base trait for event agents.
///
/// # Invariants
/// - `run()` returns `Err` only for failures the caller must fix (auth)
/// - `run()` never returns `ParseOutcome::Failed`; it falls back instead
#[async_trait]
pub trait Agent: Send + Sync {
    type Output: Send + 'static;

    /// Get the unique identifier for this agent.
    fn id(&self) -> &AgentId;

    /// Get the type/role of this agent.
    fn agent_type(&self) -> AgentType;

    /// Run the pipeline for one event.
    async fn run(&self, event: &EventRequest) -> Result<ParseOutcome<Self::Output>, AgentError>;

    /// Get a human-readable description of this agent.
    fn description(&self) -> &str {
        "Generic agent"
    }
}

/// What came back from the single model call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ModelReply {
    Text(String),
    Empty,
    Unavailable(String),
}

/// Call the model once and sort the answer into usable text, nothing, or a
/// recoverable failure. Authorization failures are the one error returned.
pub(crate) async fn call_model(
    llm: &dyn TextCompletion,
    prompt: &str,
    agent: AgentType,
) -> Result<ModelReply, AgentError> {
    match llm.complete(prompt).await {
        Ok(text) if text.trim().is_empty() => {
            tracing::warn!("{} agent: empty response from model", agent);
            Ok(ModelReply::Empty)
        }
        Ok(text) => {
            tracing::debug!(
                "{} agent: model response ({} chars): {}",
                agent,
                text.len(),
                preview(&text, 500)
            );
            Ok(ModelReply::Text(text))
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            if is_auth_failure(&reason) {
                tracing::error!(
                    "{} agent: model API rejected credentials ({}). Check the LLM credentials and LLM_SCOPE",
                    agent,
                    reason
                );
                return Err(AgentError::Auth { agent, reason });
            }
            tracing::warn!("{} agent: model call failed: {}", agent, reason);
            Ok(ModelReply::Unavailable(reason))
        }
    }
}

/// First `max_chars` characters of `text`, for logs.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model doubles shared by agent tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::TextCompletion;

    /// Replies with queued results in order and records every prompt.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn text(reply: &str) -> Self {
            Self::new(vec![Ok(reply)])
        }

        pub fn failing(reason: &str) -> Self {
            Self::new(vec![Err(reason)])
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextCompletion for ScriptedModel {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
                None => Err(anyhow::anyhow!("Network error: no scripted reply left")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;

    #[tokio::test]
    async fn test_call_model_sorts_replies() {
        let model = ScriptedModel::new(vec![
            Ok("{}"),
            Ok("  \n"),
            Err("Network error: Request timeout: deadline has elapsed"),
            Err("Client error (403): Forbidden {\"status\":403}"),
        ]);

        let reply = call_model(&model, "p", AgentType::Finance).await.unwrap();
        assert_eq!(reply, ModelReply::Text("{}".to_string()));

        let reply = call_model(&model, "p", AgentType::Finance).await.unwrap();
        assert_eq!(reply, ModelReply::Empty);

        let reply = call_model(&model, "p", AgentType::Finance).await.unwrap();
        assert!(matches!(reply, ModelReply::Unavailable(r) if r.contains("timeout")));

        let err = call_model(&model, "p", AgentType::Finance).await.unwrap_err();
        assert!(matches!(err, AgentError::Auth { agent: AgentType::Finance, .. }));
        assert_eq!(model.calls(), 4);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("смета", 3), "сме");
        assert_eq!(preview("abc", 10), "abc");
    }
}
