//! Value helpers for the state bag.
//!
//! Bound values are `serde_json::Value`s. Rendering follows the loose rules a
//! template author expects from a browser: numbers print without a trailing
//! `.0`, arrays join with commas, and a missing value renders as nothing.

use indexmap::IndexMap;
use serde_json::Value;

/// Insertion-ordered mapping from property name to current value
pub type StateBag = IndexMap<String, Value>;

/// Render a resolved value as bound text. `None` is an unresolved path.
pub fn display(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(v) => display_value(v),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn display_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_nan() => "NaN".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Truthiness used by `*if` and `!expr`
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Walk a dotted sub-path off a value. Missing intermediates yield `None`.
pub fn walk<S: AsRef<str>>(value: &Value, segments: &[S]) -> Option<Value> {
    let mut current = value;
    for (i, segment) in segments.iter().enumerate() {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                if segment == "length" && i + 1 == segments.len() {
                    return Some(Value::from(items.len()));
                }
                items.get(segment.parse::<usize>().ok()?)?
            }
            Value::String(s) if segment == "length" && i + 1 == segments.len() => {
                return Some(Value::from(s.chars().count()));
            }
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Return `base` with `segments` set to `value`, creating objects for missing
/// intermediates. Array segments must be in-bounds indices.
pub fn set_path<S: AsRef<str>>(base: Option<Value>, segments: &[S], value: Value) -> Value {
    let Some((head, tail)) = segments.split_first() else {
        return value;
    };
    let head = head.as_ref();

    match base {
        Some(Value::Array(mut items)) => match head.parse::<usize>() {
            Ok(index) if index < items.len() => {
                let child = std::mem::take(&mut items[index]);
                items[index] = set_path(Some(child), tail, value);
                Value::Array(items)
            }
            _ => Value::Array(items),
        },
        Some(Value::Object(mut map)) => {
            let child = map.get_mut(head).map(std::mem::take);
            map.insert(head.to_string(), set_path(child, tail, value));
            Value::Object(map)
        }
        _ => {
            let mut map = serde_json::Map::new();
            map.insert(head.to_string(), set_path(None, tail, value));
            Value::Object(map)
        }
    }
}

/// Parse a literal the way an attribute author writes one: JSON when it is
/// valid JSON, otherwise the raw text as a string.
pub fn parse_literal(raw: &str) -> Value {
    serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()))
}
