//! Finance agent - budget breakdown for an event.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use super::prompts::budget_prompt;
use super::{call_model, Agent, AgentError, AgentId, AgentType, ModelReply};
use crate::budget::{fallback_budget, reconcile, BudgetResult, LineItem, Reconciliation};
use crate::event::{EventRequest, DEFAULT_BUDGET};
use crate::llm::TextCompletion;
use crate::recovery::{parse_completion, recover_line_items, ParseOutcome};

const DEFAULT_PRIORITY: &str = "medium";

/// Agent that asks the model for a budget and guarantees a usable result.
pub struct FinanceAgent {
    id: AgentId,
    llm: Arc<dyn TextCompletion>,
}

impl FinanceAgent {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self {
            id: AgentId::new(),
            llm,
        }
    }

    /// Calculate the budget for `event`.
    ///
    /// Fails only on authorization errors. Every other problem ends in a
    /// fallback estimate.
    pub async fn calculate_budget(
        &self,
        event: &EventRequest,
    ) -> Result<ParseOutcome<BudgetResult>, AgentError> {
        tracing::info!(
            agent_id = %self.id,
            "Finance agent: calculating budget for {}",
            event.event_name
        );

        let prompt = budget_prompt(event);
        let outcome = match call_model(self.llm.as_ref(), &prompt, AgentType::Finance).await? {
            ModelReply::Text(raw) => interpret_budget(&raw),
            ModelReply::Empty => ParseOutcome::Failed("empty response".to_string()),
            ModelReply::Unavailable(reason) => ParseOutcome::Failed(reason),
        };

        let mut outcome = match outcome {
            ParseOutcome::Failed(reason) => {
                tracing::warn!("Finance agent: using fallback budget ({})", reason);
                ParseOutcome::FallbackUsed(fallback_budget(
                    event.guests_or_default(),
                    event.ceiling().unwrap_or(DEFAULT_BUDGET),
                ))
            }
            mut usable => {
                if let Some(result) = usable.as_inner_mut() {
                    settle(result, event.ceiling());
                }
                usable
            }
        };

        let source = outcome.source();
        if let Some(result) = outcome.as_inner_mut() {
            decorate_budget(result);
            tracing::info!(
                "Finance agent: budget ready ({} items, total {:.2}, source {})",
                result.items.len(),
                result.total_amount,
                source
            );
        }
        Ok(outcome)
    }
}

/// Turn a raw completion into a budget, escalating to partial recovery.
///
/// A document that parses but has no line items counts as a failure.
pub fn interpret_budget(raw: &str) -> ParseOutcome<BudgetResult> {
    let outcome = parse_completion::<BudgetResult>(raw);
    if outcome.as_inner().is_some_and(|r| !r.items.is_empty()) {
        return outcome;
    }

    let reason = match outcome {
        ParseOutcome::Failed(reason) => reason,
        _ => {
            tracing::warn!("Model budget contains no line items");
            "response contains no line items".to_string()
        }
    };

    match recover_line_items(raw) {
        Some(result) => ParseOutcome::Recovered(result),
        None => ParseOutcome::Failed(reason),
    }
}

/// Replace the model's total with the item sum, then enforce the ceiling.
fn settle(result: &mut BudgetResult, ceiling: Option<f64>) {
    let sum = result.items_sum();
    if (sum - result.total_amount).abs() > 0.005 {
        tracing::info!(
            "Model total {:.2} differs from item sum {:.2}; using item sum",
            result.total_amount,
            sum
        );
    }
    result.total_amount = sum;

    match reconcile(result, ceiling) {
        Reconciliation::Unconstrained => tracing::debug!("No ceiling supplied; budget not reconciled"),
        Reconciliation::WithinBudget { headroom } => {
            tracing::info!("Budget fits the ceiling with {:.2} to spare", headroom)
        }
        Reconciliation::Rescaled { ratio } => {
            tracing::warn!("Budget exceeded the ceiling; rescaled by {:.4}", ratio)
        }
    }
}

/// Presentational pass: display ids, default priority and flexibility, and a
/// category summary appended to the analysis. Item order is preserved.
pub fn decorate_budget(result: &mut BudgetResult) {
    for (index, item) in result.items.iter_mut().enumerate() {
        item.id = Some(index as u32 + 1);
        item.priority
            .get_or_insert_with(|| DEFAULT_PRIORITY.to_string());
        item.is_flexible.get_or_insert(true);
    }

    if result.items.is_empty() {
        return;
    }

    let mut summary = String::from("Структура сметы:");
    for (index, item) in result.items.iter().enumerate() {
        let _ = write!(
            summary,
            "\n{}. {}: {:.2} руб.",
            index + 1,
            item.category,
            item.planned_amount
        );
        summarize_subcategories(&mut summary, &item.subcategories, 1);
    }

    if result.analysis.trim().is_empty() {
        result.analysis = summary;
    } else {
        result.analysis = format!("{}\n\n{}", result.analysis.trim_end(), summary);
    }
}

fn summarize_subcategories(summary: &mut String, items: &[LineItem], depth: usize) {
    for item in items {
        let _ = write!(
            summary,
            "\n{}- {}: {:.2} руб.",
            "   ".repeat(depth),
            item.category,
            item.planned_amount
        );
        summarize_subcategories(summary, &item.subcategories, depth + 1);
    }
}

#[async_trait]
impl Agent for FinanceAgent {
    type Output = BudgetResult;

    fn id(&self) -> &AgentId {
        &self.id
    }

    fn agent_type(&self) -> AgentType {
        AgentType::Finance
    }

    async fn run(&self, event: &EventRequest) -> Result<ParseOutcome<BudgetResult>, AgentError> {
        self.calculate_budget(event).await
    }

    fn description(&self) -> &str {
        "Calculates an event budget and keeps it within the ceiling"
    }
}
