//! Budget module - line items, reconciliation against a ceiling, and the
//! model-free fallback estimate.
//!
//! # Key Concepts
//! - LineItem: one category/amount/description record, optionally nested
//! - BudgetResult: the finance agent's output, serialised as the model's JSON shape
//! - Reconciliation: linear scale-down so the total never exceeds the ceiling
//! - Fallback: fixed-fraction estimate used when the model gives nothing usable

mod fallback;
mod reconcile;

pub use fallback::{fallback_budget, CATERING_PER_GUEST, GIFTS_PER_GUEST};
pub use reconcile::{reconcile, Reconciliation};

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of checking a result against its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    WithinBudget,
    Error,
}

/// One budget entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// 1-based display id, assigned by the finance agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub category: String,
    #[serde(default, alias = "amount", deserialize_with = "deserialize_amount")]
    pub planned_amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_flexible: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<LineItem>,
}

impl LineItem {
    pub fn new(category: impl Into<String>, planned_amount: f64, description: impl Into<String>) -> Self {
        Self {
            id: None,
            category: category.into(),
            planned_amount: planned_amount.max(0.0),
            description: description.into(),
            priority: None,
            is_flexible: None,
            subcategories: Vec::new(),
        }
    }

    pub fn with_subcategories(mut self, subcategories: Vec<LineItem>) -> Self {
        self.subcategories = subcategories;
        self
    }

    /// Multiply this item's amount and every nested amount by `ratio`.
    pub fn scale(&mut self, ratio: f64) {
        self.planned_amount *= ratio;
        for sub in &mut self.subcategories {
            sub.scale(ratio);
        }
    }
}

/// Aggregate budget for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetResult {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total_amount: f64,
    /// Absent when no ceiling was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BudgetStatus>,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl BudgetResult {
    /// Build a result whose total is the sum of `items`.
    pub fn from_items(items: Vec<LineItem>, analysis: impl Into<String>, recommendations: Vec<String>) -> Self {
        let mut result = Self {
            items,
            total_amount: 0.0,
            status: None,
            analysis: analysis.into(),
            recommendations,
        };
        result.total_amount = result.items_sum();
        result
    }

    /// Terminal result when the pipeline itself could not run.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            total_amount: 0.0,
            status: Some(BudgetStatus::Error),
            analysis: format!("Не удалось рассчитать смету: {}", reason.into()),
            recommendations: vec![
                "Обратитесь к администратору сервиса и повторите запрос позже".to_string(),
            ],
        }
    }

    /// Sum of top-level item amounts.
    pub fn items_sum(&self) -> f64 {
        self.items.iter().map(|item| item.planned_amount).sum()
    }
}

/// Amounts arrive as numbers, numeric strings, or null. Negatives clamp to zero.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
        Null,
    }

    let value = match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => n,
        RawAmount::Text(s) => {
            let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            cleaned.parse::<f64>().map_err(|_| {
                serde::de::Error::custom(format!("invalid amount: {:?}", s))
            })?
        }
        RawAmount::Null => 0.0,
    };

    Ok(if value.is_finite() { value.max(0.0) } else { 0.0 })
}
