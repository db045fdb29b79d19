//! Recovery of structured data from raw model output.
//!
//! Generation backends asked for JSON frequently wrap it in markdown fences,
//! preamble prose, Python literals or trailing commas. [`parse_structured`]
//! runs a fixed, ordered pipeline of text transforms, re-attempting a parse
//! after each one. Every transform operates on the output of the previous
//! failed step, and the first successful parse short-circuits, so results are
//! reproducible.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?```$").unwrap()
});

static PYTHON_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(True|False|None)\b").unwrap());

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Every repair attempt failed. Carries the unmodified backend reply for
/// diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("failed to recover structured data from model output")]
pub struct RepairError {
    pub raw: String,
}

/// Parses a backend's raw text reply into a JSON value, escalating through
/// normalization steps when the direct parse fails:
///
/// 1. direct parse of the trimmed text
/// 2. strip a surrounding fenced code block
/// 3. extract the first `{`/`[` .. last `}`/`]` span
/// 4. single quotes → double quotes, `True`/`False`/`None` → JSON literals
/// 5. drop trailing commas before `}`/`]`
/// 6. strip control characters
#[tracing::instrument(skip(raw), fields(len = raw.len()))]
pub fn parse_structured(raw: &str) -> Result<Value, RepairError> {
    let mut candidate = raw.trim().to_string();
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Ok(value);
    }

    candidate = strip_code_fence(&candidate);
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Ok(value);
    }

    if let Some(span) = extract_json_span(&candidate) {
        candidate = span.to_string();
        if let Ok(value) = serde_json::from_str(&candidate) {
            return Ok(value);
        }
    }

    candidate = normalize_quasi_json(&candidate);
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Ok(value);
    }

    candidate = TRAILING_COMMA_RE.replace_all(&candidate, "$1").into_owned();
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Ok(value);
    }

    candidate.retain(|c| !c.is_control());
    serde_json::from_str(&candidate).map_err(|e| {
        tracing::warn!(error = %e, "All repair attempts exhausted");
        RepairError {
            raw: raw.to_string(),
        }
    })
}

/// Removes a leading ```` ``` ````(with optional language tag) and the
/// matching trailing fence. Input without a surrounding fence is returned
/// unchanged.
fn strip_code_fence(text: &str) -> String {
    match FENCE_RE.captures(text).and_then(|cap| cap.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => text.to_string(),
    }
}

/// Greedy span between the first `{` or `[` and the last matching closer.
fn extract_json_span(text: &str) -> Option<&str> {
    let (open_idx, closer) = match (text.find('{'), text.find('[')) {
        (Some(obj), Some(arr)) if obj < arr => (obj, '}'),
        (Some(obj), None) => (obj, '}'),
        (_, Some(arr)) => (arr, ']'),
        (None, None) => return None,
    };
    let close_idx = text.rfind(closer)?;
    if close_idx < open_idx {
        return None;
    }
    Some(&text[open_idx..=close_idx])
}

/// Python-flavored pseudo-JSON: single-quoted strings and capitalized
/// literals.
fn normalize_quasi_json(text: &str) -> String {
    let double_quoted = text.replace('\'', "\"");
    PYTHON_LITERAL_RE
        .replace_all(&double_quoted, |caps: &regex::Captures| {
            match &caps[1] {
                "True" => "true",
                "False" => "false",
                _ => "null",
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_parse_succeeds_immediately() {
        let value = parse_structured(r#"[{"a": 1}]"#).unwrap();
        assert_eq!(value, json!([{"a": 1}]));
    }

    #[test]
    fn fenced_python_literals_are_recovered() {
        let raw = "```json\n[{'a': True, 'b': None}]\n```";
        let value = parse_structured(raw).unwrap();
        assert_eq!(value, json!([{"a": true, "b": null}]));
    }

    #[test]
    fn fence_without_language_tag() {
        let raw = "```\n{\"ok\": false}\n```";
        assert_eq!(parse_structured(raw).unwrap(), json!({"ok": false}));
    }

    #[test]
    fn trailing_comma_is_removed() {
        let value = parse_structured("[{\"a\":1},]").unwrap();
        assert_eq!(value, json!([{"a": 1}]));
    }

    #[test]
    fn embedded_object_is_extracted_from_prose() {
        let raw = "Here is the table you asked for:\n[{\"ticker\": \"ACME\"}]\nHope it helps!";
        let value = parse_structured(raw).unwrap();
        assert_eq!(value, json!([{"ticker": "ACME"}]));
    }

    #[test]
    fn control_characters_are_stripped_last() {
        let raw = "{\"a\":\u{0001} 1}";
        assert_eq!(parse_structured(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn hopeless_input_fails_with_original_text() {
        let err = parse_structured("not json at all").unwrap_err();
        assert_eq!(err.raw, "not json at all");
    }

    #[test]
    fn span_extraction_picks_first_opener() {
        assert_eq!(extract_json_span("x [1, {\"a\": 2}] y"), Some("[1, {\"a\": 2}]"));
        assert_eq!(extract_json_span("no structure here"), None);
        assert_eq!(extract_json_span("} reversed {"), None);
    }
}
