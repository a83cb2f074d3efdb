//! Argument normalization shared across every per-tool parser: alias
//! rewriting, audit-field injection, and placeholder detection.

use serde_json::{Map, Value};

/// Hallucination -> correct key mappings applied before dispatch. Only
/// fills a key that is not already set — tool-specific aliasing (e.g.
/// `project_id` vs `project` meaning different things for `time_get` vs
/// `time_log`) stays in the individual parsers.
const ALIAS_TABLE: &[(&str, &str)] = &[
    ("query_semantic", "query_regex"),
    ("query", "query_regex"),
    ("page_filter", "page"),
    ("page_includes", "page"),
    ("employee_id", "employee"),
    ("user_id", "employee"),
    ("username", "employee"),
];

pub fn normalize_args(args: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = args.clone();
    for (bad_key, good_key) in ALIAS_TABLE {
        if !normalized.contains_key(*good_key) {
            if let Some(value) = args.get(*bad_key) {
                normalized.insert((*good_key).to_string(), value.clone());
            }
        }
    }
    normalized
}

const AUDIT_FIELDS: &[&str] = &["logged_by", "changed_by"];

/// Fill audit fields with the current user when they're absent or empty.
pub fn inject_context(args: &mut Map<String, Value>, current_user: Option<&str>) {
    let Some(user) = current_user else { return };
    for field in AUDIT_FIELDS {
        let is_empty = match args.get(*field) {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Null) => true,
            _ => false,
        };
        if is_empty {
            args.insert((*field).to_string(), Value::String(user.to_string()));
        }
    }
}

const PLACEHOLDER_MARKERS: &[&str] = &["<<<", ">>>", "FILL_", "{RESULT", "{VALUE"];
const FREE_TEXT_FIELDS: &[&str] = &["message", "content", "text", "notes", "description", "reason"];

/// Catch the model trying to defer a value it doesn't have yet (e.g.
/// `"employee": "<<<FILL_FROM_SEARCH>>>"`). Free-text fields are exempt —
/// a wiki page's prose is allowed to contain these substrings.
pub fn detect_placeholder(args: &Map<String, Value>) -> Option<String> {
    for (key, value) in args {
        if FREE_TEXT_FIELDS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        let Value::String(s) = value else { continue };
        let upper = s.to_uppercase();
        for marker in PLACEHOLDER_MARKERS {
            if upper.contains(marker) {
                return Some(format!(
                    "Argument '{key}' contains placeholder value '{s}'. You cannot use \
                     placeholders! Wait for the previous tool results before calling dependent \
                     tools. Execute tools one at a time when values depend on previous results."
                ));
            }
        }
    }
    None
}
