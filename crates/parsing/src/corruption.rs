//! Corruption scan: small models occasionally emit bytes that are valid
//! JSON but not valid *content* — stray CJK glyphs, raw control characters,
//! or Cyrillic homoglyphs smuggled into a key name. None of these break
//! `serde_json`, so they have to be caught before the repair ladder runs,
//! not after.

use regex::Regex;

const CJK_LOW: u32 = 0x4E00;
const CJK_HIGH: u32 = 0x9FFF;
const CYRILLIC_LOW: u32 = 0x0400;
const CYRILLIC_HIGH: u32 = 0x04FF;

/// Scan the tail of the response starting at `"action_queue"` for corrupted
/// bytes, after stripping legitimate `"message": "..."` string contents
/// (free-form prose can legally contain any Unicode). Returns a short
/// context window around the first offending character, if any.
pub fn detect_corruption(raw: &str) -> Option<String> {
    let start = raw.find("\"action_queue\"")?;
    let tail = &raw[start..];
    let stripped = strip_message_values(tail);

    let chars: Vec<(usize, char)> = stripped.char_indices().collect();
    for &(byte_idx, ch) in &chars {
        let cp = ch as u32;
        if (CJK_LOW..=CJK_HIGH).contains(&cp) {
            return Some(context_window(&stripped, byte_idx, "CJK character"));
        }
        if is_stray_control(ch) {
            return Some(context_window(&stripped, byte_idx, "raw control character"));
        }
    }

    if let Some(m) = cyrillic_key_regex().find(&stripped) {
        return Some(context_window(&stripped, m.start(), "Cyrillic key name"));
    }

    None
}

fn is_stray_control(ch: char) -> bool {
    matches!(ch, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}')
}

fn cyrillic_key_regex() -> Regex {
    Regex::new(&format!(
        r#""[^"]*[\u{:04x}-\u{:04x}][^"]*"\s*:\s*\["#,
        CYRILLIC_LOW, CYRILLIC_HIGH
    ))
    .expect("static regex is valid")
}

fn message_value_regex() -> Regex {
    Regex::new(r#"("message"\s*:\s*)"((?:[^"\\]|\\.)*)"#).expect("static regex is valid")
}

/// Replace the *contents* of every `"message": "..."` value with a fixed
/// placeholder, keeping the surrounding JSON structure intact so offsets
/// for the rest of the scan stay meaningful.
fn strip_message_values(text: &str) -> String {
    message_value_regex()
        .replace_all(text, |caps: &regex::Captures| format!("{}\"msg\"", &caps[1]))
        .into_owned()
}

fn context_window(text: &str, byte_idx: usize, label: &str) -> String {
    let before_start = text
        .char_indices()
        .rev()
        .find(|&(i, _)| i <= byte_idx.saturating_sub(20))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let after_end = text
        .char_indices()
        .find(|&(i, _)| i >= byte_idx + 30)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let snippet = &text[before_start..after_end.min(text.len())];
    format!("{label} near: {snippet:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_response_has_no_corruption() {
        let raw = r#"{"thoughts":"fine","action_queue":[{"tool":"who_am_i","args":{}}]}"#;
        assert!(detect_corruption(raw).is_none());
    }

    #[test]
    fn flags_cjk_glyph_in_tail() {
        let raw = r#"{"thoughts":"ok","action_queue":[{"tool":"who_am_i","args":{"note":"正"}}]}"#;
        assert!(detect_corruption(raw).is_some());
    }

    #[test]
    fn message_prose_is_not_flagged() {
        let raw = r#"{"action_queue":[{"tool":"respond","args":{"message":"Das Projekt läuft gut, ça va."}}]}"#;
        assert!(detect_corruption(raw).is_none());
    }

    #[test]
    fn flags_stray_control_byte() {
        let raw = "{\"action_queue\":[{\"tool\":\"who_am_i\",\"args\":{\"x\":\"\u{1}\"}}]}";
        assert!(detect_corruption(raw).is_some());
    }

    #[test]
    fn no_action_queue_key_skips_scan() {
        let raw = "not even json";
        assert!(detect_corruption(raw).is_none());
    }
}
