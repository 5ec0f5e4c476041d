//! Maestro - routes a free-text request to the planning and finance agents.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::planning::{fallback_plan, EventPlan, PlanningAgent};
use super::prompts::intent_prompt;
use super::{call_model, Agent, AgentError, AgentId, AgentType, FinanceAgent, ModelReply};
use crate::budget::BudgetResult;
use crate::event::EventRequest;
use crate::llm::TextCompletion;
use crate::recovery::ParseOutcome;

const PLAN_WORDS: &[&str] = &["план", "plan"];
const BUDGET_WORDS: &[&str] = &["смет", "бюджет", "budget", "estimate"];

const UNKNOWN_INTENT_MESSAGE: &str =
    "Не удалось определить намерение. Попробуйте переформулировать запрос.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateEventPlan,
    CalculateBudget,
    FullEventPlanning,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateEventPlan => "create_event_plan",
            Self::CalculateBudget => "calculate_budget",
            Self::FullEventPlanning => "full_event_planning",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an exact intent label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "create_event_plan" => Some(Self::CreateEventPlan),
            "calculate_budget" => Some(Self::CalculateBudget),
            "full_event_planning" => Some(Self::FullEventPlanning),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    fn confidence(&self) -> f64 {
        match self {
            Self::Unknown => 0.0,
            _ => 0.95,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify by word stems when the model's answer is unusable.
pub fn classify_by_keywords(message: &str) -> Intent {
    let lower = message.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    match (mentions(PLAN_WORDS), mentions(BUDGET_WORDS)) {
        (true, true) => Intent::FullEventPlanning,
        (true, false) => Intent::CreateEventPlan,
        (false, true) => Intent::CalculateBudget,
        (false, false) => Intent::Unknown,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaestroRequest {
    pub user_id: String,
    pub message: String,
    /// May carry `event_data` with an event request.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MaestroResults {
    Plan(EventPlan),
    Budget(BudgetResult),
    Full { plan: EventPlan, budget: BudgetResult },
    Message { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MaestroResponse {
    pub intent: Intent,
    pub confidence: f64,
    pub agents_used: Vec<AgentType>,
    pub results: MaestroResults,
}

pub struct Maestro {
    id: AgentId,
    llm: Arc<dyn TextCompletion>,
    planning: Arc<PlanningAgent>,
    finance: Arc<FinanceAgent>,
}

impl Maestro {
    pub fn new(
        llm: Arc<dyn TextCompletion>,
        planning: Arc<PlanningAgent>,
        finance: Arc<FinanceAgent>,
    ) -> Self {
        Self {
            id: AgentId::new(),
            llm,
            planning,
            finance,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Ask the model for an intent label; fall back to keywords when the
    /// answer is not one of the known labels or the call fails.
    pub async fn classify_intent(&self, message: &str) -> Intent {
        let prompt = intent_prompt(message);
        let answer = match call_model(self.llm.as_ref(), &prompt, AgentType::Maestro).await {
            Ok(ModelReply::Text(text)) => text,
            Ok(_) => String::new(),
            Err(e) => {
                tracing::warn!("Intent classification failed: {}", e);
                String::new()
            }
        };

        let label = answer
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
            .to_lowercase();
        match Intent::parse(&label) {
            Some(intent) => intent,
            None => {
                let intent = classify_by_keywords(message);
                tracing::info!(
                    "Model intent {:?} not recognised; keyword match gives {}",
                    label,
                    intent
                );
                intent
            }
        }
    }

    pub async fn process_request(
        &self,
        request: MaestroRequest,
    ) -> Result<MaestroResponse, AgentError> {
        tracing::info!(
            agent_id = %self.id,
            "Maestro: processing request from user {}",
            request.user_id
        );

        let intent = self.classify_intent(&request.message).await;
        tracing::info!("Maestro: detected intent {}", intent);

        let (agents_used, results) = match intent {
            Intent::CreateEventPlan => {
                let event = event_from_context(request.context.as_ref());
                let plan = self.planning.generate_plan(&event).await?;
                (
                    vec![AgentType::Planning],
                    MaestroResults::Plan(plan.into_inner().unwrap_or_else(fallback_plan)),
                )
            }
            Intent::CalculateBudget => {
                let event = event_from_context(request.context.as_ref());
                let budget = self.finance.calculate_budget(&event).await?;
                (
                    vec![AgentType::Finance],
                    MaestroResults::Budget(
                        budget
                            .into_inner()
                            .unwrap_or_else(|| BudgetResult::error("no result")),
                    ),
                )
            }
            Intent::FullEventPlanning => {
                let event = event_from_context(request.context.as_ref());
                let (plan, budget) = self.plan_and_budget(event).await?;
                (
                    vec![AgentType::Planning, AgentType::Finance],
                    MaestroResults::Full { plan, budget },
                )
            }
            Intent::Unknown => (
                Vec::new(),
                MaestroResults::Message {
                    message: UNKNOWN_INTENT_MESSAGE.to_string(),
                },
            ),
        };

        Ok(MaestroResponse {
            intent,
            confidence: intent.confidence(),
            agents_used,
            results,
        })
    }

    /// Run both agents concurrently on separate tasks.
    ///
    /// A task that dies yields the fallback plan or an error budget; an
    /// authorization failure from either agent is returned.
    async fn plan_and_budget(
        &self,
        event: EventRequest,
    ) -> Result<(EventPlan, BudgetResult), AgentError> {
        let plan_task = tokio::spawn(run_agent(self.planning.clone(), event.clone()));
        let budget_task = tokio::spawn(run_agent(self.finance.clone(), event));
        let (plan, budget) = futures::future::join(plan_task, budget_task).await;

        let plan = match plan {
            Ok(outcome) => outcome?.into_inner().unwrap_or_else(fallback_plan),
            Err(e) => {
                tracing::error!("Planning task failed: {}", e);
                fallback_plan()
            }
        };
        let budget = match budget {
            Ok(outcome) => outcome?
                .into_inner()
                .unwrap_or_else(|| BudgetResult::error("no result")),
            Err(e) => {
                tracing::error!("Finance task failed: {}", e);
                BudgetResult::error(e.to_string())
            }
        };
        Ok((plan, budget))
    }
}

async fn run_agent<A>(
    agent: Arc<A>,
    event: EventRequest,
) -> Result<ParseOutcome<A::Output>, AgentError>
where
    A: Agent + 'static,
{
    tracing::debug!("Running {} agent {}", agent.agent_type(), agent.id());
    agent.run(&event).await
}

/// `context.event_data` when present and well-formed, else the placeholder event.
fn event_from_context(context: Option<&serde_json::Value>) -> EventRequest {
    if let Some(data) = context.and_then(|c| c.get("event_data")) {
        match serde_json::from_value::<EventRequest>(data.clone()) {
            Ok(event) => return event,
            Err(e) => tracing::warn!("Ignoring malformed event_data in context: {}", e),
        }
    }
    EventRequest::placeholder(chrono::Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedModel;
    use crate::budget::BudgetStatus;

    struct Fixture {
        maestro: Maestro,
        planning_model: Arc<ScriptedModel>,
        finance_model: Arc<ScriptedModel>,
    }

    fn fixture(intent: ScriptedModel, planning: ScriptedModel, finance: ScriptedModel) -> Fixture {
        let planning_model = Arc::new(planning);
        let finance_model = Arc::new(finance);
        let maestro = Maestro::new(
            Arc::new(intent),
            Arc::new(PlanningAgent::new(planning_model.clone())),
            Arc::new(FinanceAgent::new(finance_model.clone())),
        );
        Fixture {
            maestro,
            planning_model,
            finance_model,
        }
    }

    fn request(message: &str, context: Option<serde_json::Value>) -> MaestroRequest {
        MaestroRequest {
            user_id: "user-1".to_string(),
            message: message.to_string(),
            context,
        }
    }

    #[test]
    fn test_keyword_classification() {
        assert_eq!(classify_by_keywords("Составь план и смету"), Intent::FullEventPlanning);
        assert_eq!(classify_by_keywords("Нужен ПЛАН конференции"), Intent::CreateEventPlan);
        assert_eq!(classify_by_keywords("Какой бюджет нужен?"), Intent::CalculateBudget);
        assert_eq!(classify_by_keywords("Budget estimate please"), Intent::CalculateBudget);
        assert_eq!(classify_by_keywords("Привет"), Intent::Unknown);
    }

    #[tokio::test]
    async fn test_model_label_is_normalised() {
        let f = fixture(
            ScriptedModel::text("  Calculate_Budget.\n"),
            ScriptedModel::new(vec![]),
            ScriptedModel::new(vec![]),
        );
        assert_eq!(f.maestro.classify_intent("что-то").await, Intent::CalculateBudget);
    }

    #[tokio::test]
    async fn test_budget_intent_uses_context_event() {
        let f = fixture(
            ScriptedModel::text("calculate_budget"),
            ScriptedModel::new(vec![]),
            ScriptedModel::text(""),
        );
        let context = serde_json::json!({
            "event_data": {"event_name": "Форум", "expected_guests": 50, "budget_limit": 500000}
        });

        let response = f
            .maestro
            .process_request(request("Посчитай", Some(context)))
            .await
            .unwrap();

        assert_eq!(response.intent, Intent::CalculateBudget);
        assert_eq!(response.confidence, 0.95);
        assert_eq!(response.agents_used, vec![AgentType::Finance]);
        match response.results {
            MaestroResults::Budget(budget) => assert_eq!(budget.items.len(), 9),
            other => panic!("unexpected results: {other:?}"),
        }
        assert!(f.finance_model.prompts.lock().unwrap()[0].contains("- Название: Форум"));
        assert_eq!(f.planning_model.calls(), 0);
    }

    #[tokio::test]
    async fn test_full_planning_runs_both_with_keyword_fallback() {
        let f = fixture(
            ScriptedModel::failing("Network error: Connection failed"),
            ScriptedModel::text(""),
            ScriptedModel::text(""),
        );

        let response = f
            .maestro
            .process_request(request("Составь план и смету", None))
            .await
            .unwrap();

        assert_eq!(response.intent, Intent::FullEventPlanning);
        assert_eq!(
            response.agents_used,
            vec![AgentType::Planning, AgentType::Finance]
        );
        match &response.results {
            MaestroResults::Full { plan, budget } => {
                assert_eq!(plan, &fallback_plan());
                assert_eq!(budget.items.len(), 9);
                assert_eq!(budget.status, Some(BudgetStatus::WithinBudget));
            }
            other => panic!("unexpected results: {other:?}"),
        }
        // The placeholder event is used without context.
        assert!(f.finance_model.prompts.lock().unwrap()[0].contains("- Название: Новое событие"));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["intent"], "full_event_planning");
        assert!(value["results"]["plan"]["timeline_phases"].is_array());
        assert!(value["results"]["budget"]["items"].is_array());
    }

    #[tokio::test]
    async fn test_unknown_intent_asks_to_rephrase() {
        let f = fixture(
            ScriptedModel::text("unknown"),
            ScriptedModel::new(vec![]),
            ScriptedModel::new(vec![]),
        );
        let response = f
            .maestro
            .process_request(request("Составь план", None))
            .await
            .unwrap();

        // A valid label from the model wins over keywords.
        assert_eq!(response.intent, Intent::Unknown);
        assert_eq!(response.confidence, 0.0);
        assert!(response.agents_used.is_empty());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["results"]["message"], UNKNOWN_INTENT_MESSAGE);
    }

    #[tokio::test]
    async fn test_auth_failure_in_full_planning_propagates() {
        let f = fixture(
            ScriptedModel::text("full_event_planning"),
            ScriptedModel::text(""),
            ScriptedModel::failing("Client error (403): Forbidden"),
        );
        let err = f
            .maestro
            .process_request(request("Всё сразу", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Auth { agent: AgentType::Finance, .. }));
    }
}
