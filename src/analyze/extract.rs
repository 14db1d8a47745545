use serde_json::{json, Value};

/// The first complete `{...}` span, matching braces outside string literals.
/// `None` when there is no `{` or it never closes.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Everything from the first `{` to the last `}`, with no balancing.
pub fn first_to_last_brace(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Drop literal `\n` escape sequences. Works around models that emit
/// newline escapes between JSON tokens; not a general JSON repair.
pub fn strip_escaped_newlines(candidate: &str) -> String {
    candidate.replace("\\n", "")
}

/// True when every value of a JSON object is a scalar.
pub fn is_flat(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .values()
            .all(|v| !matches!(v, Value::Object(_) | Value::Array(_))),
        _ => false,
    }
}

/// Diagnostic stand-in for an answer that could not be parsed.
pub fn passthrough(raw: &str, error: impl std::fmt::Display) -> Value {
    json!({
        "result": raw,
        "json_error": error.to_string(),
    })
}
