//! Isolating the JSON payload inside a raw completion.

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Return the part of `raw` most likely to be the JSON document.
///
/// A `json`-tagged fence (any case) wins over a bare fence; an unterminated fence runs to
/// the end of the text, which keeps truncated payloads intact. Without fences,
/// leading prose before the first `{` is dropped. Never fails: if nothing
/// matches, the trimmed input comes back and the parser reports the problem.
pub fn extract_json(raw: &str) -> &str {
    // ASCII lowercasing keeps byte offsets valid for `raw`.
    if let Some(start) = raw.to_ascii_lowercase().find(JSON_FENCE) {
        return fenced_body(&raw[start + JSON_FENCE.len()..]);
    }
    if let Some(start) = raw.find(FENCE) {
        return fenced_body(&raw[start + FENCE.len()..]);
    }

    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    match trimmed.find('{') {
        Some(start) => &trimmed[start..],
        None => trimmed,
    }
}

/// Content up to the closing fence (or the end of the text), trimmed.
fn fenced_body(rest: &str) -> &str {
    let end = rest.find(FENCE).unwrap_or(rest.len());
    rest[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_fence() {
        let raw = "Вот смета:\n```json\n  {\"items\": []}\n```\nУдачи!";
        assert_eq!(extract_json(raw), "{\"items\": []}");
    }

    #[test]
    fn test_json_fence_preferred_over_earlier_bare_fence() {
        let raw = "```\nnot this\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_json_fence_tag_is_case_insensitive() {
        let raw = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw), "{\"a\": 1}");
        let raw = "Ответ:\n```Json\n{\"items\": []}\n```";
        assert_eq!(extract_json(raw), "{\"items\": []}");
    }

    #[test]
    fn test_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_unterminated_fence_keeps_tail() {
        let raw = "```json\n{\"items\": [{\"category\": \"A\"";
        assert_eq!(extract_json(raw), "{\"items\": [{\"category\": \"A\"");
    }

    #[test]
    fn test_unwrapped_is_unchanged() {
        let raw = "{\"items\": [], \"total_amount\": 0}";
        assert_eq!(extract_json(raw), raw);
        assert_eq!(extract_json("  \n{\"a\": 1}\n "), "{\"a\": 1}");
    }

    #[test]
    fn test_leading_prose_dropped() {
        assert_eq!(extract_json("Конечно! {\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(extract_json("no json here"), "no json here");
        assert_eq!(extract_json(""), "");
    }
}
