//! Tolerant extraction of a JSON object embedded in free-form text.
//!
//! Model responses often wrap the object in prose or markdown fences. The
//! scanner walks every `{`, finds its balanced closing brace (ignoring braces
//! inside string literals) and returns the first candidate that parses as an
//! object.

use serde_json::{Map, Value};

/// Return the first well-formed JSON object found in `text`.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..start + end]) {
                return Some(map);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced `{...}` prefix of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
