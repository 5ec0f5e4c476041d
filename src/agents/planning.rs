//! Planning agent - timeline and preparation tasks for an event.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompts::planning_prompt;
use super::{call_model, Agent, AgentError, AgentId, AgentType, ModelReply};
use crate::event::EventRequest;
use crate::llm::TextCompletion;
use crate::recovery::{parse_completion, ParseOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePhase {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    #[serde(default)]
    pub title: String,
    /// HIGH, MEDIUM or LOW as the model writes it.
    #[serde(default)]
    pub priority: String,
    /// Days before the event by which the task must be done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_days: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Planning agent output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPlan {
    #[serde(default)]
    pub timeline_phases: Vec<TimelinePhase>,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
    #[serde(default)]
    pub critical_path: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl EventPlan {
    /// A plan with neither phases nor tasks carries nothing to act on.
    pub fn is_empty(&self) -> bool {
        self.timeline_phases.is_empty() && self.tasks.is_empty()
    }
}

fn phase(time: &str, activity: &str) -> TimelinePhase {
    TimelinePhase {
        time: time.to_string(),
        activity: activity.to_string(),
        description: String::new(),
    }
}

fn task(title: &str, priority: &str, deadline_days: i64) -> PlanTask {
    PlanTask {
        title: title.to_string(),
        priority: priority.to_string(),
        deadline_days: Some(deadline_days),
        description: String::new(),
    }
}

/// Fixed one-day plan used when the model gives nothing usable.
pub fn fallback_plan() -> EventPlan {
    EventPlan {
        timeline_phases: vec![
            phase("09:00 - 10:00", "Регистрация участников"),
            phase("10:00 - 12:00", "Основная программа"),
            phase("12:00 - 13:00", "Обед"),
            phase("13:00 - 17:00", "Продолжение программы"),
        ],
        tasks: vec![
            task("Забронировать площадку", "HIGH", 60),
            task("Согласовать программу", "HIGH", 45),
            task("Заключить договор с кейтерингом", "MEDIUM", 30),
        ],
        critical_path: vec![
            "Площадка".to_string(),
            "Программа".to_string(),
            "Кейтеринг".to_string(),
        ],
        recommendations: vec!["Начните подготовку за 2-3 месяца".to_string()],
    }
}

pub struct PlanningAgent {
    id: AgentId,
    llm: Arc<dyn TextCompletion>,
}

impl PlanningAgent {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self {
            id: AgentId::new(),
            llm,
        }
    }

    /// Generate a plan for `event`, falling back to [`fallback_plan`] on
    /// anything but an authorization failure.
    pub async fn generate_plan(
        &self,
        event: &EventRequest,
    ) -> Result<ParseOutcome<EventPlan>, AgentError> {
        tracing::info!(
            agent_id = %self.id,
            "Planning agent: generating plan for {}",
            event.event_name
        );

        let prompt = planning_prompt(event);
        let outcome = match call_model(self.llm.as_ref(), &prompt, AgentType::Planning).await? {
            ModelReply::Text(raw) => match parse_completion::<EventPlan>(&raw) {
                ParseOutcome::Parsed(plan) | ParseOutcome::Repaired(plan) if plan.is_empty() => {
                    ParseOutcome::Failed("plan has no phases or tasks".to_string())
                }
                other => other,
            },
            ModelReply::Empty => ParseOutcome::Failed("empty response".to_string()),
            ModelReply::Unavailable(reason) => ParseOutcome::Failed(reason),
        };

        Ok(match outcome {
            ParseOutcome::Failed(reason) => {
                tracing::warn!("Planning agent: using fallback plan ({})", reason);
                ParseOutcome::FallbackUsed(fallback_plan())
            }
            usable => {
                tracing::info!("Planning agent: plan ready (source {})", usable.source());
                usable
            }
        })
    }
}

#[async_trait]
impl Agent for PlanningAgent {
    type Output = EventPlan;

    fn id(&self) -> &AgentId {
        &self.id
    }

    fn agent_type(&self) -> AgentType {
        AgentType::Planning
    }

    async fn run(&self, event: &EventRequest) -> Result<ParseOutcome<EventPlan>, AgentError> {
        self.generate_plan(event).await
    }

    fn description(&self) -> &str {
        "Builds an event timeline, preparation tasks and critical path"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedModel;

    fn planner(model: ScriptedModel) -> PlanningAgent {
        PlanningAgent::new(Arc::new(model))
    }

    fn event() -> EventRequest {
        let mut event = EventRequest::new("Хакатон");
        event.expected_guests = 80;
        event
    }

    #[tokio::test]
    async fn test_parses_fenced_plan() {
        let raw = r#"Вот план:
```json
{
  "timeline_phases": [{"time": "10:00 - 11:00", "activity": "Открытие", "description": "Приветствие"}],
  "tasks": [{"title": "Найти менторов", "priority": "HIGH", "deadline_days": 20}],
  "critical_path": ["Менторы"],
  "recommendations": ["Подготовьте призы"]
}
```"#;
        let outcome = planner(ScriptedModel::text(raw))
            .generate_plan(&event())
            .await
            .unwrap();

        assert_eq!(outcome.source(), "model");
        let plan = outcome.into_inner().unwrap();
        assert_eq!(plan.timeline_phases[0].activity, "Открытие");
        assert_eq!(plan.tasks[0].deadline_days, Some(20));
        assert_eq!(plan.tasks[0].description, "");
    }

    #[tokio::test]
    async fn test_truncated_plan_is_repaired() {
        let raw = r#"{"timeline_phases": [{"time": "09:00", "activity": "Сбор", "description": "Кофе и регистра"#;
        let outcome = planner(ScriptedModel::text(raw))
            .generate_plan(&event())
            .await
            .unwrap();
        assert!(matches!(outcome, ParseOutcome::Repaired(_)));
        assert_eq!(
            outcome.into_inner().unwrap().timeline_phases[0].description,
            "Кофе и регистра"
        );
    }

    #[tokio::test]
    async fn test_unusable_replies_fall_back() {
        for model in [
            ScriptedModel::text(""),
            ScriptedModel::text("Не могу составить план"),
            ScriptedModel::text(r#"{"critical_path": []}"#),
            ScriptedModel::failing("Network error: Request timeout"),
        ] {
            let outcome = planner(model).generate_plan(&event()).await.unwrap();
            assert!(outcome.is_fallback());
            assert_eq!(outcome.into_inner().unwrap(), fallback_plan());
        }
    }

    #[tokio::test]
    async fn test_forbidden_is_fatal() {
        let err = planner(ScriptedModel::failing("Client error (403): Forbidden"))
            .generate_plan(&event())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Auth { agent: AgentType::Planning, .. }));
    }

    #[test]
    fn test_fallback_plan_shape() {
        let plan = fallback_plan();
        assert_eq!(plan.timeline_phases.len(), 4);
        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.tasks[2].priority, "MEDIUM");
        assert_eq!(plan.critical_path, ["Площадка", "Программа", "Кейтеринг"]);

        let value = serde_json::to_value(&plan).unwrap();
        assert!(value["timeline_phases"][0].get("description").is_none());
        assert_eq!(value["tasks"][0]["deadline_days"], 60);
    }
}
