//! # Deep Assignment
//!
//! Writes values at dotted paths inside a JSON object.
//!
//! Two rules hold for every write:
//!
//! - Missing intermediate segments become empty objects (never arrays), and an
//!   intermediate segment holding a scalar or array is replaced by an empty object.
//! - The assigned value is a structural copy. Mutating the source afterwards never
//!   reaches the target, and vice versa.

use serde_json::{Map, Value};

/// Set `value` at the dot-delimited `path` inside `target`.
///
/// The leaf is replaced wholesale; no merging happens between the old and new
/// value at the last segment.
///
/// ```
/// use resource_cache::deep_set::deep_set;
/// use serde_json::{json, Map};
///
/// let mut obj = Map::new();
/// deep_set(&mut obj, "a.b.c", &json!("foo"));
/// assert_eq!(serde_json::Value::Object(obj), json!({"a": {"b": {"c": "foo"}}}));
/// ```
pub fn deep_set(target: &mut Map<String, Value>, path: &str, value: &Value) {
    let mut segments = path.split('.').peekable();
    let mut node = target;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            node.insert(segment.to_owned(), value.clone());
            return;
        }

        let slot = node
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(child) => node = child,
            _ => return,
        }
    }
}

/// Read the value at the dot-delimited `path`, if every segment exists.
pub fn deep_get<'a>(source: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = source.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Copy every top-level entry of `source` into `target`.
///
/// Keys are treated as paths, so a payload key like `"address.city"` lands in a
/// nested object.
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        deep_set(target, key, value);
    }
}
