use ca_domain::TypedAction;
use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value};

use crate::args::{bool_any, f64_any, paginate, str_any, string_list};
use crate::{ParseContext, ParseOutcome};

const DEFAULT_LIMIT: u32 = 5;

pub fn parse_log(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let employee = str_any(args, &["employee", "employee_id"])
        .or_else(|| ctx.current_user.map(String::from));
    let Some(employee) = employee else {
        return ParseOutcome::Skip;
    };

    let date = str_any(args, &["date"]).unwrap_or_else(|| ctx.today.to_string());

    ParseOutcome::Action(TypedAction::TimeLog {
        employee,
        project: str_any(args, &["project", "project_id"]),
        customer: str_any(args, &["customer"]),
        date,
        hours: f64_any(args, "hours", 0.0),
        work_category: str_any(args, &["work_category"]).unwrap_or_else(|| "dev".to_string()),
        notes: str_any(args, &["notes"]),
        billable: bool_any(args, "billable", true),
        status: str_any(args, &["status"]).unwrap_or_else(|| "draft".to_string()),
        logged_by: str_any(args, &["logged_by"]).unwrap_or_default(),
    })
}

pub fn parse_get(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    if let Some(id) = str_any(args, &["id"]) {
        return ParseOutcome::Action(TypedAction::TimeGet { id });
    }

    // An agent sometimes calls time_get with search-shaped params instead of
    // an id. Rather than skip, honor the intent and run a search.
    let employee = str_any(args, &["employee", "employee_id"]);
    let date_from = str_any(args, &["date_from", "from_date", "from"]);
    let date_to = str_any(args, &["date_to", "to_date", "to"]);
    let date_single = str_any(args, &["date"]);
    let project = str_any(args, &["project", "project_id"]);

    if employee.is_none() && date_from.is_none() && date_to.is_none() && date_single.is_none() && project.is_none() {
        return ParseOutcome::Skip;
    }

    let (date_from, date_to) = match (date_from, date_single) {
        (None, Some(d)) => (Some(d.clone()), Some(d)),
        (from, _) => (from, date_to),
    };

    ParseOutcome::Action(TypedAction::TimeSearch {
        employee: employee.or_else(|| ctx.current_user.map(String::from)),
        project,
        date_from,
        date_to,
        billable: None,
        offset: 0,
        limit: 10,
    })
}

pub fn parse_search(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let (offset, limit) = paginate(args, DEFAULT_LIMIT);
    let mut employee = str_any(args, &["employee", "employee_id"]);
    if employee.as_deref().map(|e| e.eq_ignore_ascii_case("me")).unwrap_or(false) {
        employee = ctx.current_user.map(String::from);
    }
    let employee = employee.or_else(|| ctx.current_user.map(String::from));

    ParseOutcome::Action(TypedAction::TimeSearch {
        employee,
        project: str_any(args, &["project", "project_id"]),
        date_from: str_any(args, &["date_from"]),
        date_to: str_any(args, &["date_to"]),
        billable: args.get("billable").map(|_| bool_any(args, "billable", false)),
        offset,
        limit,
    })
}

pub fn parse_update(args: &Map<String, Value>, _ctx: &ParseContext<'_>) -> ParseOutcome {
    let Some(id) = str_any(args, &["id"]) else {
        return ParseOutcome::Skip;
    };

    let mut fields = Map::new();
    for key in ["date", "hours", "work_category", "notes", "billable", "status"] {
        if let Some(value) = args.get(key) {
            fields.insert(key.to_string(), value.clone());
        }
    }
    if let Some(changed_by) = str_any(args, &["changed_by"]) {
        fields.insert("changed_by".to_string(), Value::String(changed_by));
    }

    ParseOutcome::Action(TypedAction::TimeUpdate { id, fields })
}

pub fn parse_summary_by_employee(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let (date_from, date_to) = date_range(args, ctx);
    ParseOutcome::Action(TypedAction::TimeSummaryByEmployee {
        date_from,
        date_to,
        employees: list_or_singular(args, "employees", "employee"),
        projects: list_or_singular(args, "projects", "project"),
        customers: list_or_singular(args, "customers", "customer"),
        billable: args.get("billable").map(|_| bool_any(args, "billable", false)),
    })
}

pub fn parse_summary_by_project(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let (date_from, date_to) = date_range(args, ctx);
    ParseOutcome::Action(TypedAction::TimeSummaryByProject {
        date_from,
        date_to,
        employees: list_or_singular(args, "employees", "employee"),
        projects: list_or_singular(args, "projects", "project"),
        customers: list_or_singular(args, "customers", "customer"),
        billable: args.get("billable").map(|_| bool_any(args, "billable", false)),
    })
}

fn list_or_singular(args: &Map<String, Value>, plural: &str, singular: &str) -> Vec<String> {
    let list = string_list(args, plural);
    if !list.is_empty() {
        return list;
    }
    string_list(args, singular)
}

/// Full-year-to-date default: an agent asking "total hours on this project"
/// usually means all time logged this year, not just since yesterday.
fn date_range(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> (String, String) {
    let date_from = str_any(args, &["date_from"]);
    let date_to = str_any(args, &["date_to"]);
    match (date_from, date_to) {
        (Some(from), Some(to)) => (from, to),
        (from, to) => {
            let year_start = NaiveDate::from_ymd_opt(ctx.today.year(), 1, 1).unwrap();
            (
                from.unwrap_or_else(|| year_start.to_string()),
                to.unwrap_or_else(|| ctx.today.to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn ctx<'a>(qs: &'a HashSet<String>, wiki: &'a HashMap<String, String>, wiki_api: &'a HashMap<String, String>) -> ParseContext<'a> {
        ParseContext {
            current_user: Some("alice"),
            today: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: qs,
            loaded_wiki_content: wiki,
            loaded_wiki_content_api: wiki_api,
        }
    }

    #[test]
    fn log_defaults_employee_and_date() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = ctx(&qs, &wiki, &wiki_api);
        let args = map(json!({"hours": 4}));
        match parse_log(&args, &pctx) {
            ParseOutcome::Action(TypedAction::TimeLog { employee, date, .. }) => {
                assert_eq!(employee, "alice");
                assert_eq!(date, "2026-06-15");
            }
            other => panic!("expected TimeLog, got {other:?}"),
        }
    }

    #[test]
    fn get_falls_back_to_search_when_given_search_params() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = ctx(&qs, &wiki, &wiki_api);
        let args = map(json!({"project": "proj_atlas", "date": "2026-06-01"}));
        match parse_get(&args, &pctx) {
            ParseOutcome::Action(TypedAction::TimeSearch { date_from, date_to, .. }) => {
                assert_eq!(date_from.as_deref(), Some("2026-06-01"));
                assert_eq!(date_to.as_deref(), Some("2026-06-01"));
            }
            other => panic!("expected TimeSearch, got {other:?}"),
        }
    }

    #[test]
    fn summary_defaults_date_range_to_year_to_date() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = ctx(&qs, &wiki, &wiki_api);
        let args = map(json!({"project": "proj_atlas"}));
        match parse_summary_by_project(&args, &pctx) {
            ParseOutcome::Action(TypedAction::TimeSummaryByProject { date_from, date_to, projects, .. }) => {
                assert_eq!(date_from, "2026-01-01");
                assert_eq!(date_to, "2026-06-15");
                assert_eq!(projects, vec!["proj_atlas"]);
            }
            other => panic!("expected TimeSummaryByProject, got {other:?}"),
        }
    }
}
