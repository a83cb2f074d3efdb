use ca_domain::{Link, LinkKind, TypedAction};
use serde_json::{Map, Value};

use crate::args::str_any;
use crate::{ParseContext, ParseOutcome};

pub fn parse_respond(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let query_specificity = str_any(args, &["query_specificity", "querySpecificity", "specificity"])
        .map(|s| s.to_lowercase().trim().to_string())
        .unwrap_or_else(|| "unspecified".to_string());

    let denial_basis = str_any(args, &["denial_basis", "denialBasis", "denial_reason", "denialReason"])
        .map(|s| s.to_lowercase().trim().to_string());

    let message = extract_message(args, &query_specificity);
    let outcome = str_any(args, &["outcome", "Outcome"]).unwrap_or_else(|| infer_outcome(&message));

    let raw_links = args
        .get("links")
        .or_else(|| args.get("Links"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut links = ca_links::normalize_links(&raw_links);

    if links.is_empty() && outcome == "ok_answer" {
        links = auto_extract_links(&message);
    }

    // Employee links still need an async back-office existence check before
    // the response is final (`ca_links::validate_employee_links`). This
    // parser is synchronous, so that check happens in the action processor
    // immediately after a `Respond` action comes back from here.

    if ctx.had_mutations {
        links = ca_links::add_mutation_entities(&links, ctx.mutation_entities, None);
    } else if outcome == "ok_answer" && !ctx.search_entities.is_empty() {
        links = add_mentioned_search_entities(&links, ctx.search_entities, &message);
    }
    // ok_not_found and anything else: search entities are not the answer.

    links = ca_links::deduplicate(&links);

    if !ctx.query_subject_ids.is_empty() {
        links.retain(|l| !ctx.query_subject_ids.contains(&l.id));
    }

    if outcome == "error_internal" || outcome == "denied_security" {
        links.clear();
    }

    ParseOutcome::Action(TypedAction::Respond {
        outcome,
        message,
        links,
        query_specificity,
        denial_basis,
    })
}

fn extract_message(args: &Map<String, Value>, query_specificity_raw: &str) -> String {
    if let Some(message) = str_any(
        args,
        &[
            "message", "Message", "text", "Text", "response", "Response", "answer", "Answer",
            "content", "Content", "details", "Details", "body", "Body",
        ],
    ) {
        return message;
    }

    // A model sometimes writes the actual answer into query_specificity by
    // mistake. A short value there is a real specificity label; a long one
    // is almost certainly misplaced prose.
    if query_specificity_raw.len() > 50 {
        return query_specificity_raw.to_string();
    }

    "No message provided.".to_string()
}

fn infer_outcome(message: &str) -> String {
    let lower = message.to_lowercase();
    let denies = lower.contains("cannot") || lower.contains("unable to") || lower.contains("could not");
    if !denies {
        return "ok_answer".to_string();
    }
    if lower.contains("tool") || lower.contains("system") {
        "none_unsupported".to_string()
    } else if ["permission", "access", "allow", "restricted"].iter().any(|w| lower.contains(w)) {
        "denied_security".to_string()
    } else {
        "none_clarification_needed".to_string()
    }
}

/// Extract links from the primary answer segment first; only fall back to
/// scanning the whole message when that segment yields nothing. Prevents a
/// runner-up entity named in a later explanatory sentence ("Although X...")
/// from being linked as if it were the answer.
fn auto_extract_links(message: &str) -> Vec<Link> {
    let primary = primary_answer_segment(message);
    let primary_links = ca_links::extract_from_message(&primary);
    if primary_links.is_empty() {
        return ca_links::extract_from_message(message);
    }

    let full_links = ca_links::extract_from_message(message);
    let primary_has_employee = primary_links.iter().any(|l| l.kind == LinkKind::Employee);

    let non_employee: Vec<Link> = full_links.into_iter().filter(|l| l.kind != LinkKind::Employee).collect();
    let employee: Vec<Link> = if primary_has_employee {
        primary_links.into_iter().filter(|l| l.kind == LinkKind::Employee).collect()
    } else {
        ca_links::extract_from_message(message)
            .into_iter()
            .filter(|l| l.kind == LinkKind::Employee)
            .collect()
    };

    let mut combined = non_employee;
    combined.extend(employee);
    ca_links::deduplicate(&combined)
}

fn primary_answer_segment(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_list_start(trimmed) {
        return trimmed.to_string();
    }

    let mut prev: Option<char> = None;
    for (i, c) in trimmed.char_indices() {
        if matches!(c, '.' | '!' | '?') && !prev.is_some_and(|p| p.is_ascii_digit()) {
            let end = i + c.len_utf8();
            return trimmed[..end].to_string();
        }
        prev = Some(c);
    }

    trimmed.lines().next().unwrap_or(trimmed).to_string()
}

fn is_list_start(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.starts_with('-') || trimmed.starts_with('*') || trimmed.starts_with('\u{2022}') {
        return true;
    }
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    !digits.is_empty() && trimmed[digits.len()..].starts_with('.')
}

/// Entities a turn searched for become links only when the response
/// actually names them (or, for a customer, when its project was named —
/// a project and its owning customer arrive together in search results).
fn add_mentioned_search_entities(links: &[Link], search_entities: &[Link], message: &str) -> Vec<Link> {
    let message_lower = message.to_lowercase();
    let mentioned_ids: Vec<&str> = search_entities
        .iter()
        .filter(|e| message_lower.contains(&e.id.to_lowercase()))
        .map(|e| e.id.as_str())
        .collect();

    let mut result = links.to_vec();
    for entity in search_entities {
        let directly_mentioned = message_lower.contains(&entity.id.to_lowercase());
        let related_via_project = entity.kind == LinkKind::Customer
            && mentioned_ids.iter().any(|id| id.starts_with("proj_"));

        if (directly_mentioned || related_via_project) && !result.contains(entity) {
            result.push(entity.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn base_ctx<'a>(
        qs: &'a HashSet<String>,
        wiki: &'a HashMap<String, String>,
        wiki_api: &'a HashMap<String, String>,
        mutation_entities: &'a [Link],
        search_entities: &'a [Link],
        had_mutations: bool,
    ) -> ParseContext<'a> {
        ParseContext {
            current_user: Some("alice"),
            today: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations,
            mutation_entities,
            search_entities,
            query_subject_ids: qs,
            loaded_wiki_content: wiki,
            loaded_wiki_content_api: wiki_api,
        }
    }

    #[test]
    fn outcome_is_inferred_from_denial_wording() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = base_ctx(&qs, &wiki, &wiki_api, &[], &[], false);
        let args = map(json!({"message": "I cannot do that, you don't have access."}));
        match parse_respond(&args, &pctx) {
            ParseOutcome::Action(TypedAction::Respond { outcome, .. }) => {
                assert_eq!(outcome, "denied_security");
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[test]
    fn clears_links_for_denied_security() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = base_ctx(&qs, &wiki, &wiki_api, &[], &[], false);
        let args = map(json!({
            "message": "cannot share salary, access restricted",
            "links": ["emp_jonas_weiss"]
        }));
        match parse_respond(&args, &pctx) {
            ParseOutcome::Action(TypedAction::Respond { links, .. }) => assert!(links.is_empty()),
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[test]
    fn primary_segment_wins_over_runner_up_mentioned_later() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = base_ctx(&qs, &wiki, &wiki_api, &[], &[], false);
        let args = map(json!({
            "message": "jonas_weiss has the highest python skill. Although maria_silva also knows python."
        }));
        match parse_respond(&args, &pctx) {
            ParseOutcome::Action(TypedAction::Respond { links, .. }) => {
                assert!(links.contains(&Link::employee("jonas_weiss")));
                assert!(!links.contains(&Link::employee("maria_silva")));
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[test]
    fn mutation_entities_are_added_without_bare_current_user() {
        let mutation_entities = vec![Link::project("proj_atlas")];
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = base_ctx(&qs, &wiki, &wiki_api, &mutation_entities, &[], true);
        let args = map(json!({"message": "Updated the team."}));
        match parse_respond(&args, &pctx) {
            ParseOutcome::Action(TypedAction::Respond { links, .. }) => {
                assert_eq!(links, vec![Link::project("proj_atlas")]);
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }

    #[test]
    fn search_entity_is_linked_only_when_mentioned_in_message() {
        let search_entities = vec![Link::project("proj_atlas"), Link::project("proj_nova")];
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = base_ctx(&qs, &wiki, &wiki_api, &[], &search_entities, false);
        let args = map(json!({"message": "proj_atlas is on track."}));
        match parse_respond(&args, &pctx) {
            ParseOutcome::Action(TypedAction::Respond { links, .. }) => {
                assert!(links.contains(&Link::project("proj_atlas")));
                assert!(!links.contains(&Link::project("proj_nova")));
            }
            other => panic!("expected Respond, got {other:?}"),
        }
    }
}
