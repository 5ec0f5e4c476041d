//! Wiring of agents to a shared model client.

use std::sync::Arc;

use super::{FinanceAgent, Maestro, PlanningAgent};
use crate::config::{AgentTuning, Config};
use crate::llm::{LlmClient, ModelHandle, TextCompletion};

/// Shared client plus configuration; hands out agents with their tuning.
#[derive(Clone)]
pub struct AgentContext {
    pub config: Config,
    pub llm: Arc<dyn LlmClient>,
}

impl AgentContext {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        Self { config, llm }
    }

    /// A completion handle on the configured model with `tuning` applied.
    pub fn completion(&self, tuning: AgentTuning) -> Arc<dyn TextCompletion> {
        Arc::new(ModelHandle::new(
            Arc::clone(&self.llm),
            self.config.llm.model.clone(),
            tuning.chat_options(),
        ))
    }

    pub fn planning_agent(&self) -> PlanningAgent {
        PlanningAgent::new(self.completion(self.config.planning))
    }

    pub fn finance_agent(&self) -> FinanceAgent {
        FinanceAgent::new(self.completion(self.config.finance))
    }

    /// Orchestrator routing to the given agents.
    pub fn maestro(&self, planning: Arc<PlanningAgent>, finance: Arc<FinanceAgent>) -> Maestro {
        Maestro::new(self.completion(self.config.intent), planning, finance)
    }
}
