//! JSON repair ladder: a small model's completion is usually *almost*
//! valid JSON. Rather than fail the whole turn, try a fixed sequence of
//! targeted repairs and take the first one that parses.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct RepairError(pub String);

/// Strip a markdown fence and leading prose, try a strict parse, then fall
/// through an ordered ladder of repairs. First candidate that parses wins.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, RepairError> {
    let trimmed = strip_fence(raw);

    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Ok(v);
    }

    let repairs: [fn(&str) -> Option<String>; 5] = [
        fix_plan_step_status,
        fix_customer_id_as_tool,
        fix_action_queue_braces,
        fix_via_balanced_object_scan,
        fix_truncated,
    ];

    for repair in repairs {
        if let Some(candidate) = repair(trimmed) {
            if let Ok(v) = serde_json::from_str::<serde_json::Value>(&candidate) {
                return Ok(v);
            }
        }
    }

    serde_json::from_str::<serde_json::Value>(trimmed)
        .map_err(|e| RepairError(format!("unrepairable: {e}")))
}

/// Drop a leading ```json / ``` fence and anything before the first `{`.
fn strip_fence(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = raw.strip_prefix("```json").unwrap_or(raw);
    let raw = raw.strip_prefix("```").unwrap_or(raw);
    let raw = raw.strip_suffix("```").unwrap_or(raw);
    match raw.find('{') {
        Some(idx) => raw[idx..].trim(),
        None => raw.trim(),
    }
}

fn plan_step_status_regex() -> Regex {
    Regex::new(
        r#"(?m)(?P<prefix>[\[,]\s*)"step"\s*:\s*"(?P<step>(?:[^"\\]|\\.)*)"\s*,\s*"status"\s*:\s*"(?P<status>(?:[^"\\]|\\.)*)""#,
    )
    .expect("static regex is valid")
}

/// Some completions emit bare `"step": ..., "status": ...` pairs inside the
/// `plan` array instead of wrapping each as its own object.
fn fix_plan_step_status(text: &str) -> Option<String> {
    if !text.contains("\"step\"") {
        return None;
    }
    let re = plan_step_status_regex();
    if !re.is_match(text) {
        return None;
    }
    let fixed = re
        .replace_all(text, |caps: &regex::Captures| {
            format!(
                "{}{{\"step\": \"{}\", \"status\": \"{}\"}}",
                &caps["prefix"], &caps["step"], &caps["status"]
            )
        })
        .into_owned();
    Some(fixed)
}

fn customer_id_tool_regex() -> Regex {
    Regex::new(r#"\{\s*"tool"\s*:\s*"(cust_[A-Za-z0-9_]+)"\s*\}"#).expect("static regex is valid")
}

/// The model sometimes shorthands a customer lookup as `{"tool":
/// "cust_acme"}` instead of the canonical `{"tool": "customers_get",
/// "args": {"id": "cust_acme"}}`.
fn fix_customer_id_as_tool(text: &str) -> Option<String> {
    let re = customer_id_tool_regex();
    if !re.is_match(text) {
        return None;
    }
    let fixed = re
        .replace_all(text, |caps: &regex::Captures| {
            format!(
                r#"{{"tool": "customers_get", "args": {{"id": "{}"}}}}"#,
                &caps[1]
            )
        })
        .into_owned();
    Some(fixed)
}

/// If `action_queue` has more `{` than `}` before its closing `]`, and the
/// text still goes on to an `"is_final"` field, the missing closes were
/// almost certainly dropped rather than the whole response being cut off.
/// Insert them back just before the array closes.
fn fix_action_queue_braces(text: &str) -> Option<String> {
    let aq_idx = text.find("\"action_queue\"")?;
    let is_final_idx = text[aq_idx..].find("\"is_final\"")? + aq_idx;
    let segment = &text[aq_idx..is_final_idx];

    let bracket_idx = segment.find('[')?;
    let close_bracket_rel = find_matching_bracket(&segment[bracket_idx..], '[', ']')?;
    let close_bracket_abs = aq_idx + bracket_idx + close_bracket_rel;

    let body = &text[aq_idx + bracket_idx + 1..close_bracket_abs];
    let opens = body.matches('{').count();
    let closes = body.matches('}').count();
    if opens <= closes {
        return None;
    }
    let deficit = opens - closes;
    let mut fixed = String::with_capacity(text.len() + deficit);
    fixed.push_str(&text[..close_bracket_abs]);
    for _ in 0..deficit {
        fixed.push('}');
    }
    fixed.push_str(&text[close_bracket_abs..]);
    Some(fixed)
}

/// Walk `text` (which must start with the opening bracket) tracking string
/// and escape state, returning the index (relative to `text`) of the
/// matching close.
fn find_matching_bracket(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Scan for every balanced top-level `{...}` object in the text and prefer
/// the one that looks most like a plan (carries the most of `thoughts`,
/// `plan`, `action_queue`, `is_final`), falling back to the largest.
fn fix_via_balanced_object_scan(text: &str) -> Option<String> {
    let objects = find_all_json_objects(text);
    if objects.is_empty() {
        return None;
    }

    const MARKERS: [&str; 4] = ["\"thoughts\"", "\"plan\"", "\"action_queue\"", "\"is_final\""];

    objects
        .into_iter()
        .max_by_key(|obj| {
            let marker_hits = MARKERS.iter().filter(|m| obj.contains(*m)).count();
            (marker_hits, obj.len())
        })
}

fn find_all_json_objects(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let bytes: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i < bytes.len() {
        let (byte_idx, ch) = bytes[i];
        if ch == '{' {
            if let Some(end_rel) = find_matching_bracket(&text[byte_idx..], '{', '}') {
                let end_abs = byte_idx + end_rel;
                found.push(text[byte_idx..end_abs].to_string());
            }
        }
        i += 1;
    }
    found
}

/// Last resort: append whatever closing brackets the open/close count
/// deficit implies; if that still fails to parse, trim trailing characters
/// one at a time until the longest parseable prefix remains.
fn fix_truncated(text: &str) -> Option<String> {
    let open_braces = text.matches('{').count();
    let close_braces = text.matches('}').count();
    let open_brackets = text.matches('[').count();
    let close_brackets = text.matches(']').count();

    let mut suffix = String::new();
    for _ in 0..open_brackets.saturating_sub(close_brackets) {
        suffix.push(']');
    }
    for _ in 0..open_braces.saturating_sub(close_braces) {
        suffix.push('}');
    }
    if !suffix.is_empty() {
        let candidate = format!("{text}{suffix}");
        if serde_json::from_str::<serde_json::Value>(&candidate).is_ok() {
            return Some(candidate);
        }
    }

    let chars: Vec<char> = text.chars().collect();
    for end in (1..=chars.len()).rev() {
        let prefix: String = chars[..end].iter().collect();
        let mut candidate = prefix.clone();
        let o = prefix.matches('{').count();
        let c = prefix.matches('}').count();
        let ob = prefix.matches('[').count();
        let cb = prefix.matches(']').count();
        for _ in 0..ob.saturating_sub(cb) {
            candidate.push(']');
        }
        for _ in 0..o.saturating_sub(c) {
            candidate.push('}');
        }
        if serde_json::from_str::<serde_json::Value>(&candidate).is_ok() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_passes_through() {
        let raw = r#"{"thoughts":"t","plan":[],"action_queue":[],"is_final":true}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["thoughts"], "t");
    }

    #[test]
    fn strips_fence_and_prose() {
        let raw = "here's my plan:\n```json\n{\"thoughts\":\"t\",\"action_queue\":[]}\n```";
        let v = extract_json(raw).unwrap();
        assert_eq!(v["thoughts"], "t");
    }

    #[test]
    fn fixes_bare_plan_step_status_pairs() {
        let raw = r#"{"thoughts":"t","plan":["step": "do x", "status": "pending"],"action_queue":[],"is_final":false}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["plan"][0]["step"], "do x");
    }

    #[test]
    fn fixes_customer_shorthand_tool() {
        let raw = r#"{"thoughts":"t","plan":[],"action_queue":[{"tool": "cust_acme"}],"is_final":false}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["action_queue"][0]["tool"], "customers_get");
        assert_eq!(v["action_queue"][0]["args"]["id"], "cust_acme");
    }

    #[test]
    fn recovers_balanced_object_from_surrounding_noise() {
        let raw = "Sure! {\"thoughts\":\"t\",\"action_queue\":[],\"is_final\":true} Hope that helps.";
        let v = extract_json(raw).unwrap();
        assert_eq!(v["is_final"], true);
    }

    #[test]
    fn appends_missing_closing_brackets() {
        let raw = r#"{"thoughts":"t","plan":[],"action_queue":[{"tool":"who_am_i","args":{}}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["action_queue"][0]["tool"], "who_am_i");
    }

    #[test]
    fn gives_up_gracefully_on_pure_garbage() {
        assert!(extract_json("not json at all").is_err());
    }
}
