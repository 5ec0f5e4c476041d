//! Closing JSON that the model cut off mid-structure.
//!
//! Only the truncation shapes the model actually produces are handled: a
//! response that stops inside a string value, inside an array of objects, or
//! right after a separating comma. This is not a general JSON fixer.

use std::borrow::Cow;

/// Fields whose values are free text; a dangling quote inside one of these is
/// safe to close.
const STRING_FIELDS: &[&str] = &["description", "category", "analysis", "title", "activity", "time"];

/// Structural state at the end of a (possibly truncated) document.
#[derive(Debug, Default, PartialEq, Eq)]
struct ScanState {
    /// Unmatched `{` and `[`, outermost first.
    open: Vec<char>,
    /// The text ends inside a string literal.
    in_string: bool,
    /// The text ends on a backslash that escapes nothing yet.
    dangling_escape: bool,
}

fn scan(text: &str) -> ScanState {
    let mut state = ScanState::default();
    let mut escape_next = false;

    for c in text.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if state.in_string {
            match c {
                '\\' => escape_next = true,
                '"' => state.in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => state.in_string = true,
            '{' | '[' => state.open.push(c),
            '}' | ']' => {
                // Stray closers are left for the parser to reject.
                if let Some(&top) = state.open.last() {
                    if (top == '{' && c == '}') || (top == '[' && c == ']') {
                        state.open.pop();
                    }
                }
            }
            _ => {}
        }
    }

    state.dangling_escape = escape_next;
    state
}

/// Whether the object being written when the text stopped is one with a known
/// free-text field.
fn inside_string_field(text: &str) -> bool {
    let segment = match text.rfind('{') {
        Some(idx) => &text[idx..],
        None => text,
    };
    STRING_FIELDS
        .iter()
        .any(|field| segment.contains(&format!("\"{}\"", field)))
}

/// Best-effort repair of a truncated JSON document.
///
/// Balanced input comes back borrowed and byte-identical. Otherwise a dangling
/// string in a known text field is closed, a trailing comma is dropped, and
/// every unmatched `{`/`[` is closed innermost-first.
pub fn repair_truncated_json(text: &str) -> Cow<'_, str> {
    let state = scan(text);
    if state.open.is_empty() && !state.in_string {
        return Cow::Borrowed(text);
    }

    let mut repaired = text.to_string();
    if state.in_string {
        if !inside_string_field(text) {
            // An unknown field cut mid-string; leave it for partial recovery.
            return Cow::Borrowed(text);
        }
        if state.dangling_escape {
            // The quote would be escaped otherwise.
            repaired.pop();
        }
        repaired.push('"');
    }

    if state.open.is_empty() {
        return Cow::Owned(repaired);
    }

    let trimmed_len = repaired.trim_end().len();
    repaired.truncate(trimmed_len);
    if repaired.ends_with(',') {
        repaired.pop();
    }

    for opener in state.open.iter().rev() {
        repaired.push(if *opener == '{' { '}' } else { ']' });
    }

    tracing::debug!(
        "Closed {} unterminated structure(s) in truncated JSON{}",
        state.open.len(),
        if state.in_string { " and one string" } else { "" }
    );

    Cow::Owned(repaired)
}
