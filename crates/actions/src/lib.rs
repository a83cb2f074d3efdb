//! Action Normalizer & Parser (C2): turns one raw `{tool, args}` request
//! into a `TypedAction`, a `ParseOutcome::Error` to hand back to the model,
//! or a `ParseOutcome::Skip` when the request is too incomplete to act on
//! at all.

mod args;
mod normalize;
mod skills;

mod parsers {
    pub mod customers;
    pub mod employees;
    pub mod identity;
    pub mod projects;
    pub mod response;
    pub mod time;
    pub mod wiki;
}

use std::collections::{HashMap, HashSet};

use ca_domain::{ActionRequest, Link, TypedAction};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Read-only turn state the parser needs for the response tool's link
/// reconciliation and the wiki-update Unicode-preservation check. The
/// action processor (`ca-runtime`) builds this by borrowing straight from
/// `ca-turnstate`'s `TurnState` fields before each dispatch — this crate
/// has no dependency on that one, to keep the parser usable without
/// pulling in the whole turn-state machinery.
pub struct ParseContext<'a> {
    pub current_user: Option<&'a str>,
    pub today: NaiveDate,
    pub had_mutations: bool,
    pub mutation_entities: &'a [Link],
    pub search_entities: &'a [Link],
    pub query_subject_ids: &'a HashSet<String>,
    pub loaded_wiki_content: &'a HashMap<String, String>,
    pub loaded_wiki_content_api: &'a HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Action(TypedAction),
    /// Returned to the model verbatim as feedback.
    Error(String),
    /// The request was missing something essential (e.g. no id and no
    /// name to search by) with no specific guidance to give — the action
    /// processor reports this as a generic skipped-action line.
    Skip,
}

fn canonicalize(tool: &str) -> String {
    tool.to_lowercase().replace(['_', '-', '/'], "")
}

/// Parse one raw action request into a `ParseOutcome`, applying the shared
/// alias/context-injection/placeholder steps before dispatching to the
/// tool-specific parser.
pub fn parse_action(request: &ActionRequest, ctx: &ParseContext<'_>) -> ParseOutcome {
    let mut args = normalize::normalize_args(&request.args);
    normalize::inject_context(&mut args, ctx.current_user);

    if let Some(message) = normalize::detect_placeholder(&args) {
        return ParseOutcome::Error(message);
    }

    dispatch(&canonicalize(&request.tool), &args, ctx)
}

fn dispatch(tool: &str, args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    match tool {
        "whoami" | "me" | "identity" => parsers::identity::parse_who_am_i(),

        "employeeslist" | "listemployees" => parsers::employees::parse_list(args),
        "employeessearch" | "searchemployees" => parsers::employees::parse_search(args),
        "employeesget" | "getemployee" => parsers::employees::parse_get(args, ctx),
        "employeesupdate" | "updateemployee" | "salaryupdate" | "updatesalary" => {
            parsers::employees::parse_update(args, ctx)
        }

        "wikilist" | "listwiki" => parsers::wiki::parse_list(),
        "wikiload" | "loadwiki" | "readwiki" => parsers::wiki::parse_load(args),
        "wikisearch" | "searchwiki" => parsers::wiki::parse_search(args),
        "wikiupdate" | "updatewiki" => parsers::wiki::parse_update(args, ctx),

        "customerslist" | "listcustomers" => parsers::customers::parse_list(args),
        "customersget" | "getcustomer" => parsers::customers::parse_get(args),
        "customerssearch" | "searchcustomers" => parsers::customers::parse_search(args),

        "projectslist" | "listprojects" => parsers::projects::parse_list(args),
        "projectsget" | "getproject" => parsers::projects::parse_get(args),
        "projectssearch" | "searchprojects" => parsers::projects::parse_search(args),
        "projectsteamupdate" | "updateprojectteam" | "projectsupdateteam" | "teamupdate" => {
            parsers::projects::parse_team_update(args, ctx)
        }
        "projectsstatusupdate" | "updateprojectstatus" | "projectssetstatus" => {
            parsers::projects::parse_status_update(args, ctx)
        }
        "projectsupdate" | "updateproject" => parsers::projects::parse_generic_update(args, ctx),

        "timelog" | "logtime" => parsers::time::parse_log(args, ctx),
        "timeget" | "gettime" => parsers::time::parse_get(args, ctx),
        "timesearch" | "searchtime" => parsers::time::parse_search(args, ctx),
        "timeupdate" | "updatetime" => parsers::time::parse_update(args, ctx),
        "timesummaryemployee" | "timesummarybyemployee" | "employeetimesummary" => {
            parsers::time::parse_summary_by_employee(args, ctx)
        }
        "timesummaryproject" | "timesummarybyproject" | "projecttimesummary" => {
            parsers::time::parse_summary_by_project(args, ctx)
        }

        "respond" | "answer" | "reply" => parsers::response::parse_respond(args, ctx),

        _ => ParseOutcome::Error(format!("Unknown tool '{tool}'.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> (HashSet<String>, HashMap<String, String>, HashMap<String, String>) {
        (HashSet::new(), HashMap::new(), HashMap::new())
    }

    #[test]
    fn unknown_tool_name_yields_error_not_panic() {
        let (qs, wiki, wiki_api) = ctx();
        let pctx = ParseContext {
            current_user: None,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: &qs,
            loaded_wiki_content: &wiki,
            loaded_wiki_content_api: &wiki_api,
        };
        let request = ActionRequest {
            tool: "send_email".into(),
            args: json!({}).as_object().unwrap().clone(),
        };
        assert!(matches!(parse_action(&request, &pctx), ParseOutcome::Error(_)));
    }

    #[test]
    fn placeholder_value_is_rejected_before_dispatch() {
        let (qs, wiki, wiki_api) = ctx();
        let pctx = ParseContext {
            current_user: None,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: &qs,
            loaded_wiki_content: &wiki,
            loaded_wiki_content_api: &wiki_api,
        };
        let request = ActionRequest {
            tool: "employees_get".into(),
            args: json!({"id": "<<<FILL_FROM_SEARCH>>>"}).as_object().unwrap().clone(),
        };
        match parse_action(&request, &pctx) {
            ParseOutcome::Error(msg) => assert!(msg.contains("placeholder")),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn whoami_aliases_all_dispatch_to_identity() {
        let (qs, wiki, wiki_api) = ctx();
        let pctx = ParseContext {
            current_user: None,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: &qs,
            loaded_wiki_content: &wiki,
            loaded_wiki_content_api: &wiki_api,
        };
        for alias in ["who_am_i", "me", "identity", "whoami"] {
            let request = ActionRequest {
                tool: alias.into(),
                args: Map::new(),
            };
            assert_eq!(parse_action(&request, &pctx), ParseOutcome::Action(TypedAction::WhoAmI));
        }
    }
}
