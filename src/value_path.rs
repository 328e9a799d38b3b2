//! Dotted-path lookups into `serde_json::Value`, shared by the trigger
//! evaluator (§4.C) and the variable resolver (§4.F).
//!
//! A path segment that parses as a non-negative integer indexes into an
//! array; everything else indexes into an object. A missing path yields
//! `None` ("undefined"), never an error.

use serde_json::Value;

pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Stringify a resolved value the way template substitution does: strings
/// are unquoted, everything else uses its JSON text form.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_object_path() {
        let v = json!({"data": {"srcip": "1.2.3.4"}});
        assert_eq!(get_path(&v, "data.srcip"), Some(&json!("1.2.3.4")));
    }

    #[test]
    fn resolves_numeric_array_index() {
        let v = json!({"items": ["a", "b"]});
        assert_eq!(get_path(&v, "items.1"), Some(&json!("b")));
    }

    #[test]
    fn missing_path_is_none() {
        let v = json!({"data": {}});
        assert_eq!(get_path(&v, "data.missing.deeper"), None);
    }
}
