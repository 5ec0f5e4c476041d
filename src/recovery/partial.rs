//! Salvaging complete line items from a response that would not parse.

use std::sync::OnceLock;

use regex::Regex;

use crate::budget::{BudgetResult, LineItem};

/// `{"category": "...", "planned_amount": N, "description": "..."`, in that
/// order. The description's closing quote must be present, so an item cut
/// anywhere before it never matches.
const LINE_ITEM_PATTERN: &str = r#"\{\s*"category"\s*:\s*"((?:[^"\\]|\\.)*)"\s*,\s*"(?:planned_amount|amount)"\s*:\s*"?(-?\d+(?:\.\d+)?)"?\s*,\s*"description"\s*:\s*"((?:[^"\\]|\\.)*)""#;

fn line_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LINE_ITEM_PATTERN).expect("line item pattern compiles"))
}

/// Decode JSON string escapes in a captured value, falling back to the raw text.
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

/// Every complete line item in `raw`, in order of appearance.
pub fn scan_line_items(raw: &str) -> Vec<LineItem> {
    line_item_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let amount: f64 = caps[2].parse().ok()?;
            Some(LineItem::new(unescape(&caps[1]), amount, unescape(&caps[3])))
        })
        .collect()
}

/// Build a partial budget from whatever complete items `raw` contains.
///
/// Returns `None` when nothing matches; that is an ordinary outcome.
pub fn recover_line_items(raw: &str) -> Option<BudgetResult> {
    let items = scan_line_items(raw);
    if items.is_empty() {
        return None;
    }

    let count = items.len();
    tracing::warn!("Recovered {} complete line item(s) from a truncated response", count);

    Some(BudgetResult::from_items(
        items,
        format!(
            "Частичный результат: ответ модели был обрезан, восстановлено статей расходов: {}",
            count
        ),
        vec![
            "Внимание: часть категорий может отсутствовать. Проверьте смету вручную.".to_string(),
        ],
    ))
}
