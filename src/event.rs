//! Event request model shared by both agents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ceiling assumed when a request carries none (and for the default event).
pub const DEFAULT_BUDGET: f64 = 1_000_000.0;

/// Guest count assumed by the budget fallback when the request has none.
pub const DEFAULT_GUESTS: u32 = 100;

/// Immutable description of the event an agent works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub event_name: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub expected_guests: u32,
    /// Planning-side budget figure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Ceiling the finance agent must respect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// offline, online or hybrid
    #[serde(default)]
    pub format: String,
    /// Per-category maximums. Accepted and carried, not enforced: only the
    /// grand total is reconciled against the ceiling.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub budget_constraints: BTreeMap<String, f64>,
}

impl EventRequest {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            event_type: String::new(),
            event_date: String::new(),
            location: String::new(),
            expected_guests: 0,
            budget: None,
            budget_limit: None,
            target_audience: None,
            format: String::new(),
            budget_constraints: BTreeMap::new(),
        }
    }

    /// The spending ceiling: `budget_limit`, else `budget`.
    pub fn ceiling(&self) -> Option<f64> {
        self.budget_limit.or(self.budget)
    }

    /// Guest count with the fallback default applied to zero.
    pub fn guests_or_default(&self) -> u32 {
        if self.expected_guests == 0 {
            DEFAULT_GUESTS
        } else {
            self.expected_guests
        }
    }

    /// Placeholder event used when the orchestrator gets no event data.
    pub fn placeholder(today: chrono::NaiveDate) -> Self {
        use chrono::Datelike;

        let year_end = chrono::NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
        Self {
            event_name: "Новое событие".to_string(),
            event_type: "conference".to_string(),
            event_date: year_end.format("%Y-%m-%d").to_string(),
            location: "Москва".to_string(),
            expected_guests: DEFAULT_GUESTS,
            budget: Some(DEFAULT_BUDGET),
            budget_limit: Some(DEFAULT_BUDGET),
            target_audience: None,
            format: String::new(),
            budget_constraints: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_budget_request() {
        let request: EventRequest = serde_json::from_str(
            r#"{
                "event_name": "TechSummit 2025",
                "event_type": "conference",
                "event_date": "2025-12-15T09:00:00",
                "location": "Крокус Экспо",
                "expected_guests": 500,
                "budget_limit": 1500000,
                "budget_constraints": {"Кейтеринг": 400000}
            }"#,
        )
        .unwrap();
        assert_eq!(request.expected_guests, 500);
        assert_eq!(request.ceiling(), Some(1_500_000.0));
        assert_eq!(request.budget_constraints["Кейтеринг"], 400_000.0);
        assert_eq!(request.target_audience, None);
    }

    #[test]
    fn test_ceiling_prefers_budget_limit() {
        let mut request = EventRequest::new("x");
        assert_eq!(request.ceiling(), None);
        request.budget = Some(10.0);
        assert_eq!(request.ceiling(), Some(10.0));
        request.budget_limit = Some(5.0);
        assert_eq!(request.ceiling(), Some(5.0));
    }

    #[test]
    fn test_placeholder_is_dated_end_of_year() {
        let today = chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let event = EventRequest::placeholder(today);
        assert_eq!(event.event_date, "2026-12-31");
        assert_eq!(event.expected_guests, 100);
        assert_eq!(event.ceiling(), Some(1_000_000.0));
    }

    #[test]
    fn test_guests_default() {
        let mut request = EventRequest::new("x");
        assert_eq!(request.guests_or_default(), 100);
        request.expected_guests = 7;
        assert_eq!(request.guests_or_default(), 7);
    }
}
