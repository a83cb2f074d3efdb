//! Small extraction helpers shared by the per-tool parsers. Coerces loosely
//! typed JSON into the scalars the typed actions expect, the way a model's
//! output actually arrives — numbers as strings, single values where a list
//! is expected, and so on.

use serde_json::{Map, Value};

pub fn str_any(args: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = args.get(*key) {
            if let Some(s) = v.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

pub fn f64_any(args: &Map<String, Value>, key: &str, default: f64) -> f64 {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}

pub fn u32_any(args: &Map<String, Value>, key: &str, default: u32) -> u32 {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as u32).unwrap_or(default),
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}

pub fn bool_any(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    match args.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(default),
        _ => default,
    }
}

/// Accepts a scalar, a list of scalars, or an absent key (-> empty list).
pub fn string_list(args: &Map<String, Value>, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// `offset` wins when both `offset` and 1-based `page` are present;
/// `page` is converted using `limit`. `limit` falls back to `per_page`
/// before the tool-supplied default.
pub fn paginate(args: &Map<String, Value>, default_limit: u32) -> (u32, u32) {
    let limit = match args.get("limit") {
        Some(_) => u32_any(args, "limit", default_limit),
        None => u32_any(args, "per_page", default_limit),
    };
    let offset = if args.contains_key("offset") {
        u32_any(args, "offset", 0)
    } else if let Some(page) = args.get("page").and_then(value_as_u32) {
        page.saturating_sub(1) * limit
    } else {
        0
    };
    (offset, limit)
}

fn value_as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().map(|v| v as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn explicit_offset_wins_over_page() {
        let args = map(json!({"offset": 10, "page": 3, "limit": 5}));
        assert_eq!(paginate(&args, 5), (10, 5));
    }

    #[test]
    fn page_converts_to_offset_using_limit() {
        let args = map(json!({"page": 2, "limit": 5}));
        assert_eq!(paginate(&args, 5), (5, 5));
    }

    #[test]
    fn defaults_to_zero_offset_with_default_limit() {
        let args = map(json!({}));
        assert_eq!(paginate(&args, 5), (0, 5));
    }

    #[test]
    fn string_list_wraps_a_bare_scalar() {
        let args = map(json!({"status": "archived"}));
        assert_eq!(string_list(&args, "status"), vec!["archived".to_string()]);
    }
}
