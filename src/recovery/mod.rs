//! Turning unreliable model text into structured results.
//!
//! Each stage is a total function; the pipeline escalates by looking at which
//! [`ParseOutcome`] variant a stage returns:
//!
//! ```text
//!  raw ──► extract_json ──► strict parse ──ok──► Parsed
//!                               │ err
//!                               ▼
//!                     repair_truncated_json ──► parse ──ok──► Repaired
//!                                                 │ err
//!                                                 ▼
//!                         recover_line_items (budgets only) ──some──► Recovered
//!                                                 │ none
//!                                                 ▼
//!                                       Failed ──► caller's fallback
//! ```

mod extract;
mod partial;
mod repair;

pub use extract::extract_json;
pub use partial::{recover_line_items, scan_line_items};
pub use repair::repair_truncated_json;

use serde::de::DeserializeOwned;

/// How a structured result was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// The extracted payload parsed as-is.
    Parsed(T),
    /// The payload parsed only after truncation repair; it may be missing
    /// trailing content.
    Repaired(T),
    /// Built from the complete records found by pattern matching; partial.
    Recovered(T),
    /// Produced locally without the model.
    FallbackUsed(T),
    /// Nothing usable; carries the last parse error.
    Failed(String),
}

impl<T> ParseOutcome<T> {
    /// The result, if any stage produced one.
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::Parsed(v) | Self::Repaired(v) | Self::Recovered(v) | Self::FallbackUsed(v) => {
                Some(v)
            }
            Self::Failed(_) => None,
        }
    }

    pub fn as_inner(&self) -> Option<&T> {
        match self {
            Self::Parsed(v) | Self::Repaired(v) | Self::Recovered(v) | Self::FallbackUsed(v) => {
                Some(v)
            }
            Self::Failed(_) => None,
        }
    }

    pub fn as_inner_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Parsed(v) | Self::Repaired(v) | Self::Recovered(v) | Self::FallbackUsed(v) => {
                Some(v)
            }
            Self::Failed(_) => None,
        }
    }

    /// Whether the result is known to be incomplete.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackUsed(_))
    }

    /// Stable name for logs and API responses.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Parsed(_) => "model",
            Self::Repaired(_) => "repaired",
            Self::Recovered(_) => "partial",
            Self::FallbackUsed(_) => "fallback",
            Self::Failed(_) => "failed",
        }
    }
}

/// Extract, parse, and on failure repair-then-parse a model completion.
///
/// Never returns `Recovered` or `FallbackUsed`; those belong to the caller.
pub fn parse_completion<T: DeserializeOwned>(raw: &str) -> ParseOutcome<T> {
    let payload = extract_json(raw);

    let strict_err = match serde_json::from_str::<T>(payload) {
        Ok(value) => return ParseOutcome::Parsed(value),
        Err(e) => e,
    };
    tracing::warn!("Model response is not valid JSON ({}); attempting repair", strict_err);

    let repaired = repair_truncated_json(payload);
    if repaired.as_ref() == payload {
        return ParseOutcome::Failed(strict_err.to_string());
    }

    match serde_json::from_str::<T>(&repaired) {
        Ok(value) => {
            tracing::info!("Parsed model response after truncation repair");
            ParseOutcome::Repaired(value)
        }
        Err(e) => {
            tracing::warn!("Repaired response still fails to parse: {}", e);
            ParseOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetResult;

    #[test]
    fn test_parsed_from_fence() {
        let raw = "```json\n{\"items\": [{\"category\": \"A\", \"planned_amount\": 10, \"description\": \"a\"}], \"total_amount\": 10}\n```";
        let outcome = parse_completion::<BudgetResult>(raw);
        assert_eq!(outcome.source(), "model");
        assert_eq!(outcome.into_inner().unwrap().items.len(), 1);
    }

    #[test]
    fn test_repaired_when_truncated() {
        let raw = r#"{"items": [{"category": "A", "planned_amount": 100, "description": "x"#;
        let outcome = parse_completion::<BudgetResult>(raw);
        assert!(matches!(outcome, ParseOutcome::Repaired(_)));
        let result = outcome.into_inner().unwrap();
        assert_eq!(result.items[0].description, "x");
    }

    #[test]
    fn test_failed_when_not_json() {
        let outcome = parse_completion::<BudgetResult>("Извините, не могу составить смету");
        assert!(matches!(outcome, ParseOutcome::Failed(_)));
        assert!(outcome.into_inner().is_none());
    }

    #[test]
    fn test_failed_when_repair_cannot_help() {
        let raw = r#"{"items": [{"category": "A", "planned_amount": 1, "description": "a"}, {"category": "B", "planned_amount""#;
        assert!(matches!(
            parse_completion::<BudgetResult>(raw),
            ParseOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_partial_flags() {
        let outcome: ParseOutcome<u8> = ParseOutcome::Recovered(1);
        assert!(outcome.is_partial());
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.source(), "partial");
        assert!(ParseOutcome::FallbackUsed(1u8).is_fallback());
    }
}
