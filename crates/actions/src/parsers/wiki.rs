use ca_domain::TypedAction;
use serde_json::{Map, Value};

use crate::args::str_any;
use crate::{ParseContext, ParseOutcome};

pub fn parse_list() -> ParseOutcome {
    ParseOutcome::Action(TypedAction::WikiList)
}

pub fn parse_load(args: &Map<String, Value>) -> ParseOutcome {
    match str_any(args, &["file", "path", "page"]) {
        Some(file) => ParseOutcome::Action(TypedAction::WikiLoad { file }),
        None => ParseOutcome::Skip,
    }
}

pub fn parse_search(args: &Map<String, Value>) -> ParseOutcome {
    let query_regex = str_any(args, &["query_regex", "query", "query_semantic", "search_term"]).unwrap_or_default();
    ParseOutcome::Action(TypedAction::WikiSearch { query_regex })
}

pub fn parse_update(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let Some(file) = str_any(args, &["file", "path"]) else {
        return ParseOutcome::Skip;
    };
    let Some(mut content) = str_any(args, &["content"]) else {
        return ParseOutcome::Skip;
    };

    content = content.replace("\\n", "\n").replace("\\t", "\t");
    content = restore_original_if_matching(content, ctx);

    ParseOutcome::Action(TypedAction::WikiUpdate {
        file,
        content,
        changed_by: str_any(args, &["changed_by"]).unwrap_or_default(),
    })
}

/// If the model's submitted content is the same prose as something we
/// already loaded this task (after Unicode-equivalence normalization),
/// substitute the original bytes. Defeats the common failure mode where a
/// model silently swaps curly quotes/dashes for ASCII ones while "copying"
/// wiki content back.
fn restore_original_if_matching(content: String, ctx: &ParseContext<'_>) -> String {
    for table in [ctx.loaded_wiki_content_api, ctx.loaded_wiki_content] {
        for original in table.values() {
            if matches_approximately(&content, original) {
                return original.clone();
            }
        }
        if !table.is_empty() {
            break;
        }
    }
    content
}

fn matches_approximately(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let len_diff = (a.len() as i64 - b.len() as i64).unsigned_abs() as usize;
    if len_diff > b.len() / 10 {
        return false;
    }
    normalize_unicode(a) == normalize_unicode(b)
}

fn normalize_unicode(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| match c {
            '\u{2011}' | '\u{2013}' | '\u{2014}' | '\u{2010}' => '-',
            '\u{201c}' | '\u{201d}' | '\u{00ab}' | '\u{00bb}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn update_decodes_escaped_newlines() {
        let qs = HashSet::new();
        let wiki = HashMap::new();
        let wiki_api = HashMap::new();
        let pctx = ParseContext {
            current_user: None,
            today: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: &qs,
            loaded_wiki_content: &wiki,
            loaded_wiki_content_api: &wiki_api,
        };
        let args = map(serde_json::json!({"file": "onboarding.md", "content": "line1\\nline2"}));
        match parse_update(&args, &pctx) {
            ParseOutcome::Action(TypedAction::WikiUpdate { content, .. }) => {
                assert_eq!(content, "line1\nline2");
            }
            other => panic!("expected WikiUpdate, got {other:?}"),
        }
    }

    #[test]
    fn update_restores_original_bytes_on_unicode_equivalent_match() {
        let qs = HashSet::new();
        let wiki = HashMap::new();
        let mut wiki_api = HashMap::new();
        wiki_api.insert("onboarding.md".to_string(), "Meet the team \u{2013} say hi!".to_string());
        let pctx = ParseContext {
            current_user: None,
            today: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: &qs,
            loaded_wiki_content: &wiki,
            loaded_wiki_content_api: &wiki_api,
        };
        let args = map(serde_json::json!({
            "file": "onboarding.md",
            "content": "Meet the team - say hi!"
        }));
        match parse_update(&args, &pctx) {
            ParseOutcome::Action(TypedAction::WikiUpdate { content, .. }) => {
                assert_eq!(content, "Meet the team \u{2013} say hi!");
            }
            other => panic!("expected WikiUpdate, got {other:?}"),
        }
    }
}
