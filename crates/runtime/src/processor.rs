//! Action Processor (C8): validates, parses, dispatches, and tracks the
//! per-turn effects of one `action_queue`.

use std::collections::HashSet;

use ca_actions::{parse_action, ParseContext, ParseOutcome};
use ca_backoffice::BackOffice;
use ca_domain::{ActionRequest, Link, TypedAction, MUTATION_TOOL_NAMES};
use ca_links::EmployeeLookup;
use ca_turnstate::TurnState;
use chrono::NaiveDate;
use serde_json::Value;

use crate::dispatch::dispatch;

/// Result of processing one turn's valid action queue.
#[derive(Debug, Clone, Default)]
pub struct ProcessResult {
    pub results: Vec<String>,
    pub task_done: bool,
    pub who_am_i_called: bool,
    pub had_errors: bool,
}

fn fold(s: &str) -> String {
    s.to_lowercase().replace(['_', '-'], "")
}

/// Shape-validate a raw `action_queue`: every element must be a JSON object
/// carrying a string `tool` field. A malformed element whose textual form
/// resembles a known mutation tool name registers that tool as pending, so
/// a garbled mutation call still blocks a premature `ok_answer`.
pub fn validate_shape(
    action_queue: &[Value],
    pending_mutation_tools: &mut HashSet<String>,
) -> (Vec<ActionRequest>, usize, Vec<String>) {
    let mut valid = Vec::new();
    let mut malformed = 0;
    let mut malformed_mutation_tools = Vec::new();

    for raw in action_queue {
        match ActionRequest::from_value(raw) {
            Some(request) => valid.push(request),
            None => {
                malformed += 1;
                let flat = fold(&raw.to_string());
                if let Some(&tool) = MUTATION_TOOL_NAMES.iter().find(|mt| flat.contains(&fold(mt))) {
                    pending_mutation_tools.insert(tool.to_string());
                    malformed_mutation_tools.push(tool.to_string());
                }
            }
        }
    }

    (valid, malformed, malformed_mutation_tools)
}

fn check_respond_blocked(
    outcome: &str,
    who_am_i_called: bool,
    had_errors: bool,
    pending_mutation_tools: &HashSet<String>,
) -> Option<String> {
    if !who_am_i_called {
        return Some("You MUST call 'who_am_i' first to verify identity.".to_string());
    }
    if had_errors && outcome == "ok_answer" {
        return Some("Cannot respond 'ok_answer' when previous actions FAILED.".to_string());
    }
    if !pending_mutation_tools.is_empty() && outcome == "ok_answer" {
        let mut pending: Vec<&String> = pending_mutation_tools.iter().collect();
        pending.sort();
        let pending = pending.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        return Some(format!("Pending mutations not executed: [{pending}]"));
    }
    None
}

/// Process one turn's already-shape-validated actions in order, dispatching
/// each to the back-office and tracking mutation/search entities and
/// identity state on `state` as it goes. Stops early once a response is
/// submitted (or blocked by the back-office) — actions after that point are
/// never run.
pub async fn process(
    actions: &[ActionRequest],
    state: &mut TurnState,
    who_am_i_called: bool,
    current_user: Option<&str>,
    today: NaiveDate,
    backoffice: &dyn BackOffice,
    employee_lookup: &dyn EmployeeLookup,
) -> ProcessResult {
    let mut results = Vec::new();
    let mut had_errors = false;
    let mut task_done = false;
    let mut who_am_i_called = who_am_i_called;

    for (idx, request) in actions.iter().enumerate() {
        let n = idx + 1;

        let outcome = {
            let pctx = ParseContext {
                current_user,
                today,
                had_mutations: state.had_mutations,
                mutation_entities: &state.mutation_entities,
                search_entities: &state.search_entities,
                query_subject_ids: &state.query_subject_ids,
                loaded_wiki_content: &state.loaded_wiki_content,
                loaded_wiki_content_api: &state.loaded_wiki_content_api,
            };
            parse_action(request, &pctx)
        };

        let mut typed = match outcome {
            ParseOutcome::Action(action) => action,
            ParseOutcome::Error(msg) => {
                results.push(format!("Action {n} ERROR: {msg}"));
                had_errors = true;
                let lower = msg.to_lowercase();
                if lower.contains("does not exist") || lower.contains("unknown tool") {
                    if !state.missing_tools.contains(&request.tool) {
                        state.missing_tools.push(request.tool.clone());
                    }
                }
                continue;
            }
            ParseOutcome::Skip => {
                results.push(format!("Action {n}: SKIPPED (invalid format)"));
                had_errors = true;
                continue;
            }
        };

        if typed.is_identity() {
            who_am_i_called = true;
        }

        if let TypedAction::Respond { outcome, links, .. } = &mut typed {
            if let Some(block_msg) =
                check_respond_blocked(outcome, who_am_i_called, had_errors, &state.pending_mutation_tools)
            {
                results.push(format!("Action {n} BLOCKED: {block_msg}"));
                continue;
            }

            let validated = ca_links::validate_employee_links(std::mem::take(links), employee_lookup).await;
            *links = validated;

            task_done = true;
            results.push(format!("Action {n}: response submitted ({outcome})."));
            break;
        }

        let action_outcome = dispatch(&typed, backoffice).await;
        results.extend(action_outcome.results.clone());

        if action_outcome.had_error() {
            had_errors = true;
        } else {
            state.action_types_executed.insert(request.tool.clone());
        }

        for (key, value) in action_outcome.shared_updates {
            apply_shared_update(state, &key, value);
        }

        if !action_outcome.had_error() {
            track_mutation(&typed, state);
            track_search(&typed, state);
        }
    }

    ProcessResult {
        results,
        task_done,
        who_am_i_called,
        had_errors,
    }
}

fn apply_shared_update(state: &mut TurnState, key: &str, value: Value) {
    if let Some(file) = key.strip_prefix("loaded_wiki_content_api::") {
        if let Some(content) = value.as_str() {
            state
                .loaded_wiki_content_api
                .insert(file.to_string(), content.to_string());
        }
        return;
    }
    match key {
        "time_update_entities" => {
            if let Ok(entities) = serde_json::from_value::<Vec<Link>>(value) {
                state.mutation_entities.extend(entities);
            }
        }
        "deleted_wiki_file" => {
            if let Some(file) = value.as_str() {
                state.deleted_wiki_files.insert(file.to_string());
            }
        }
        _ => {}
    }
}

fn track_mutation(action: &TypedAction, state: &mut TurnState) {
    if !action.is_mutation() {
        return;
    }

    state.had_mutations = true;
    for alias in action.mutation_tool_aliases() {
        state.pending_mutation_tools.remove(*alias);
    }

    match action {
        TypedAction::TimeLog {
            project,
            employee,
            logged_by,
            ..
        } => {
            if let Some(project) = project {
                state.mutation_entities.push(Link::project(project));
            }
            state.mutation_entities.push(Link::employee(employee));
            if logged_by != employee && !logged_by.is_empty() {
                state.mutation_entities.push(Link::employee(logged_by));
            }
        }
        TypedAction::EmployeesUpdate { employee, .. } => {
            state.mutation_entities.push(Link::employee(employee));
        }
        TypedAction::ProjectsStatusUpdate { id, .. } => {
            state.mutation_entities.push(Link::project(id));
        }
        TypedAction::ProjectsTeamUpdate { id, team, .. } => {
            state.mutation_entities.push(Link::project(id));
            for member in team {
                state.mutation_entities.push(Link::employee(&member.employee));
            }
        }
        // TimeUpdate's entities arrive via the dispatch layer's
        // `time_update_entities` shared update, already merged above.
        TypedAction::TimeUpdate { .. } | TypedAction::WikiUpdate { .. } => {}
        _ => {}
    }
}

fn track_search(action: &TypedAction, state: &mut TurnState) {
    if !action.is_search() {
        return;
    }

    match action {
        TypedAction::TimeSearch { employee, project, .. } => {
            if let Some(employee) = employee {
                state.search_entities.push(Link::employee(employee));
            }
            if let Some(project) = project {
                state.search_entities.push(Link::project(project));
            }
        }
        TypedAction::TimeSummaryByEmployee { employees, .. } => {
            for employee in employees {
                state.search_entities.push(Link::employee(employee));
            }
        }
        TypedAction::TimeSummaryByProject { projects, .. } => {
            for project in projects {
                state.search_entities.push(Link::project(project));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ca_backoffice::MockBackOffice;
    use ca_domain::Identity;
    use serde_json::json;

    struct AlwaysFound;

    #[async_trait]
    impl EmployeeLookup for AlwaysFound {
        async fn employee_exists(&self, _id: &str) -> bool {
            true
        }
    }

    fn identity() -> Identity {
        Identity::public(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "hash".into())
    }

    fn request(tool: &str, args: Value) -> ActionRequest {
        ActionRequest {
            tool: tool.to_string(),
            args: args.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn validate_shape_separates_malformed_from_valid() {
        let queue = vec![json!({"tool": "who_am_i"}), json!("not an object"), json!({"args": {}})];
        let mut pending = HashSet::new();
        let (valid, malformed, _) = validate_shape(&queue, &mut pending);
        assert_eq!(valid.len(), 1);
        assert_eq!(malformed, 2);
    }

    #[test]
    fn validate_shape_flags_mutation_tool_names_in_malformed_entries() {
        let queue = vec![json!("time-log should have gone here")];
        let mut pending = HashSet::new();
        let (_, _, flagged) = validate_shape(&queue, &mut pending);
        assert_eq!(flagged, vec!["time_log".to_string()]);
        assert!(pending.contains("time_log"));
    }

    #[tokio::test]
    async fn respond_blocked_without_who_am_i() {
        let api = MockBackOffice::new(identity());
        let mut state = TurnState::new(20);
        let actions = vec![request(
            "respond",
            json!({"outcome": "ok_answer", "message": "done"}),
        )];
        let result = process(&actions, &mut state, false, Some("alice"), identity().today, &api, &AlwaysFound).await;
        assert!(!result.task_done);
        assert!(result.results[0].contains("BLOCKED"));
    }

    #[tokio::test]
    async fn successful_time_log_tracks_mutation_entities_and_clears_pending() {
        let api = MockBackOffice::new(identity());
        let mut state = TurnState::new(20);
        state.pending_mutation_tools.insert("time_log".to_string());

        let actions = vec![request(
            "time_log",
            json!({"employee": "jonas_weiss", "project": "proj_atlas", "hours": 3}),
        )];
        let result = process(&actions, &mut state, true, Some("jonas_weiss"), identity().today, &api, &AlwaysFound)
            .await;

        assert!(!result.had_errors);
        assert!(state.had_mutations);
        assert!(!state.pending_mutation_tools.contains("time_log"));
        assert!(state.mutation_entities.contains(&Link::project("proj_atlas")));
        assert!(state.mutation_entities.contains(&Link::employee("jonas_weiss")));
    }

    #[tokio::test]
    async fn respond_stops_the_loop_and_marks_task_done() {
        let api = MockBackOffice::new(identity());
        let mut state = TurnState::new(20);
        let actions = vec![
            request("respond", json!({"outcome": "ok_answer", "message": "All clear."})),
            request("who_am_i", json!({})),
        ];
        let result = process(&actions, &mut state, true, Some("alice"), identity().today, &api, &AlwaysFound).await;
        assert!(result.task_done);
        assert_eq!(result.results.len(), 1);
    }

    #[tokio::test]
    async fn pending_mutation_blocks_ok_answer() {
        let api = MockBackOffice::new(identity());
        let mut state = TurnState::new(20);
        state.pending_mutation_tools.insert("wiki_update".to_string());
        let actions = vec![request(
            "respond",
            json!({"outcome": "ok_answer", "message": "Done."}),
        )];
        let result = process(&actions, &mut state, true, Some("alice"), identity().today, &api, &AlwaysFound).await;
        assert!(!result.task_done);
        assert!(result.results[0].contains("Pending mutations"));
    }
}
