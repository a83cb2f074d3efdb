use ca_domain::TypedAction;
use serde_json::{Map, Value};

use crate::args::{f64_any, paginate, str_any};
use crate::skills::normalize_skills;
use crate::{ParseContext, ParseOutcome};

const DEFAULT_LIMIT: u32 = 5;

pub fn parse_list(args: &Map<String, Value>) -> ParseOutcome {
    let (offset, limit) = paginate(args, DEFAULT_LIMIT);
    ParseOutcome::Action(TypedAction::EmployeesList { offset, limit })
}

pub fn parse_search(args: &Map<String, Value>) -> ParseOutcome {
    let (offset, limit) = paginate(args, DEFAULT_LIMIT);

    let query = str_any(args, &["query", "name", "query_regex"]).or_else(|| {
        let first = str_any(args, &["first_name", "firstName"]);
        let last = str_any(args, &["last_name", "lastName"]);
        match (first, last) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(f), None) => Some(f),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        }
    });

    let skills = skill_names(args, "skills");
    let wills = skill_names(args, "wills");

    ParseOutcome::Action(TypedAction::EmployeesSearch {
        query,
        location: str_any(args, &["location"]),
        department: str_any(args, &["department"]),
        manager: str_any(args, &["manager"]),
        skills,
        wills,
        offset,
        limit,
    })
}

fn skill_names(args: &Map<String, Value>, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(value) => normalize_skills(value)
            .map(|levels| levels.into_iter().map(|s| s.name).collect())
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

pub fn parse_get(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let emp_id = str_any(args, &["id", "employee_id", "employee"]);
    let username = str_any(args, &["username", "name"]);

    if emp_id.is_none() {
        if let Some(query) = username {
            let (offset, limit) = paginate(args, DEFAULT_LIMIT);
            return ParseOutcome::Action(TypedAction::EmployeesSearch {
                query: Some(query),
                location: None,
                department: None,
                manager: None,
                skills: Vec::new(),
                wills: Vec::new(),
                offset,
                limit,
            });
        }
    }

    let emp_id = emp_id.or_else(|| ctx.current_user.map(String::from));
    match emp_id {
        Some(id) => ParseOutcome::Action(TypedAction::EmployeesGet { id }),
        None => ParseOutcome::Skip,
    }
}

pub fn parse_update(args: &Map<String, Value>, ctx: &ParseContext<'_>) -> ParseOutcome {
    let employee = str_any(args, &["employee", "id", "employee_id"]).or_else(|| ctx.current_user.map(str::to_string));
    let Some(employee) = employee else {
        return ParseOutcome::Skip;
    };

    let skills = match args.get("skills") {
        Some(v) => match normalize_skills(v) {
            Ok(s) => Some(s),
            Err(e) => return ParseOutcome::Error(e),
        },
        None => None,
    };
    let wills = match args.get("wills") {
        Some(v) => match normalize_skills(v) {
            Ok(s) => Some(s),
            Err(e) => return ParseOutcome::Error(e),
        },
        None => None,
    };

    ParseOutcome::Action(TypedAction::EmployeesUpdate {
        employee,
        salary: args.get("salary").map(|_| f64_any(args, "salary", 0.0)),
        location: str_any(args, &["location"]),
        department: str_any(args, &["department"]),
        notes: str_any(args, &["notes", "note"]),
        skills,
        wills,
        changed_by: str_any(args, &["changed_by"]).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn ctx<'a>(
        qs: &'a HashSet<String>,
        wiki: &'a HashMap<String, String>,
        wiki_api: &'a HashMap<String, String>,
    ) -> ParseContext<'a> {
        ParseContext {
            current_user: Some("alice"),
            today: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            had_mutations: false,
            mutation_entities: &[],
            search_entities: &[],
            query_subject_ids: qs,
            loaded_wiki_content: wiki,
            loaded_wiki_content_api: wiki_api,
        }
    }

    #[test]
    fn get_falls_back_to_search_when_only_name_given() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = ctx(&qs, &wiki, &wiki_api);
        let args = map(serde_json::json!({"name": "Jonas Weiss"}));
        match parse_get(&args, &pctx) {
            ParseOutcome::Action(TypedAction::EmployeesSearch { query, .. }) => {
                assert_eq!(query.as_deref(), Some("Jonas Weiss"));
            }
            other => panic!("expected search fallback, got {other:?}"),
        }
    }

    #[test]
    fn get_defaults_to_current_user_when_id_missing() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = ctx(&qs, &wiki, &wiki_api);
        let args = map(serde_json::json!({}));
        assert_eq!(
            parse_get(&args, &pctx),
            ParseOutcome::Action(TypedAction::EmployeesGet { id: "alice".into() })
        );
    }

    #[test]
    fn update_rejects_add_operator_skill() {
        let (qs, wiki, wiki_api) = (HashSet::new(), HashMap::new(), HashMap::new());
        let pctx = ctx(&qs, &wiki, &wiki_api);
        let args = map(serde_json::json!({
            "employee": "jonas_weiss",
            "skills": [{"name": "python", "level": {"$add": 1}}]
        }));
        assert!(matches!(parse_update(&args, &pctx), ParseOutcome::Error(_)));
    }
}
