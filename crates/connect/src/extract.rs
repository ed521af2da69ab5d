use policyfeed_core::RawRow;
use serde_json::Value;

/// Locate the row list inside a payload by dotted path.
///
/// An empty path means the payload itself is the list. A path that does not
/// resolve, or resolves to a non-array, yields no rows. Non-object entries
/// are discarded.
pub fn read_items(payload: Value, items_path: &str) -> Vec<RawRow> {
    let mut current = payload;
    if !items_path.is_empty() {
        for token in items_path.split('.') {
            current = match current {
                Value::Object(mut map) => match map.remove(token) {
                    Some(next) => next,
                    None => return Vec::new(),
                },
                _ => return Vec::new(),
            };
        }
    }

    match current {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Text form of a JSON scalar. Null becomes the empty string.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a response body, tolerating a leading byte-order mark.
pub fn parse_json_body(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text.trim_start_matches('\u{feff}'))
}
