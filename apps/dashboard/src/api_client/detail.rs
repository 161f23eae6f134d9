//! Extraction of the user-facing message from backend error bodies.
//!
//! FastAPI reports errors as `{"detail": ...}` where `detail` is a string,
//! an object (`{"error", "message", "suggestions"}`) or, for request
//! validation failures, a list of `{"loc", "msg", "type"}` entries.

use serde_json::Value;

pub fn extract(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail").or_else(|| value.get("error"))?;
    from_detail(detail)
}

fn from_detail(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(String::from),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
