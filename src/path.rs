//! Field extraction from JSON responses.
//!
//! Paths use the `$.A.B` form found in API docs. The leading `$` is optional,
//! and numeric segments index into arrays: `$.Vpcs.Vpc.0.VpcId`.

use serde_json::Value;

/// Resolve `path` against `value`.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix('$').unwrap_or(path);
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Resolve `path` and render the value as a plain string.
pub fn get_string(value: &Value, path: &str) -> Option<String> {
    get(value, path).map(plain_string)
}

/// Render a JSON value the way it reads in a response.
///
/// Strings come back without quotes, `null` as an empty string, and
/// everything else as its JSON text.
pub fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
