use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::link::Link;

/// A raw `{tool, args}` object exactly as the LLM wrote it. Untyped by
/// design — this is the input to the action normalizer (C2).
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub tool: String,
    pub args: Map<String, Value>,
}

impl ActionRequest {
    /// Shape-validate a raw `action_queue` element: must be a JSON object
    /// carrying a string `tool` field. Anything else is malformed and yields
    /// `None` rather than panicking.
    ///
    /// The model emits both nested (`{"tool": .., "args": {..}}`) and flat
    /// (`{"tool": .., "id": ..}`) forms. Flatten by merging every top-level
    /// sibling of `tool`/`args` into the args map, with the nested `args`
    /// object taking precedence on key conflicts.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let tool = obj.get("tool")?.as_str()?.to_string();

        let mut args = Map::new();
        for (key, val) in obj {
            if key != "tool" && key != "args" {
                args.insert(key.clone(), val.clone());
            }
        }
        if let Some(Value::Object(nested)) = obj.get("args") {
            for (key, val) in nested {
                args.insert(key.clone(), val.clone());
            }
        }

        Some(Self { tool, args })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillLevel {
    pub name: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTeamMember {
    pub employee: String,
    pub role: String,
    pub time_slice: f64,
}

/// A successful parse of an `ActionRequest` into one of the fixed tool
/// surface members. A single tagged enum stands in for what a dynamically
/// typed implementation would dispatch with a chain of type checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedAction {
    WhoAmI,

    EmployeesList {
        offset: u32,
        limit: u32,
    },
    EmployeesSearch {
        query: Option<String>,
        location: Option<String>,
        department: Option<String>,
        manager: Option<String>,
        skills: Vec<String>,
        wills: Vec<String>,
        offset: u32,
        limit: u32,
    },
    EmployeesGet {
        id: String,
    },
    EmployeesUpdate {
        employee: String,
        salary: Option<f64>,
        location: Option<String>,
        department: Option<String>,
        notes: Option<String>,
        skills: Option<Vec<SkillLevel>>,
        wills: Option<Vec<SkillLevel>>,
        changed_by: String,
    },

    WikiList,
    WikiLoad {
        file: String,
    },
    WikiSearch {
        query_regex: String,
    },
    WikiUpdate {
        file: String,
        content: String,
        changed_by: String,
    },

    CustomersList,
    CustomersGet {
        id: String,
    },
    CustomersSearch {
        query: Option<String>,
        locations: Vec<String>,
        deal_phase: Vec<String>,
        account_managers: Vec<String>,
    },

    ProjectsList,
    ProjectsGet {
        id: String,
    },
    ProjectsSearch {
        query: Option<String>,
        customer_id: Option<String>,
        status: Vec<String>,
        team_employee_id: Option<String>,
        team_role: Option<String>,
        team_min_time_slice: Option<f64>,
        include_archived: bool,
        offset: u32,
        limit: u32,
    },
    ProjectsTeamUpdate {
        id: String,
        team: Vec<ProjectTeamMember>,
        changed_by: String,
    },
    ProjectsStatusUpdate {
        id: String,
        status: String,
        changed_by: String,
    },

    TimeLog {
        employee: String,
        project: Option<String>,
        customer: Option<String>,
        date: String,
        hours: f64,
        work_category: String,
        notes: Option<String>,
        billable: bool,
        status: String,
        logged_by: String,
    },
    TimeGet {
        id: String,
    },
    TimeSearch {
        employee: Option<String>,
        project: Option<String>,
        date_from: Option<String>,
        date_to: Option<String>,
        billable: Option<bool>,
        offset: u32,
        limit: u32,
    },
    TimeUpdate {
        id: String,
        fields: Map<String, Value>,
    },
    TimeSummaryByEmployee {
        date_from: String,
        date_to: String,
        employees: Vec<String>,
        projects: Vec<String>,
        customers: Vec<String>,
        billable: Option<bool>,
    },
    TimeSummaryByProject {
        date_from: String,
        date_to: String,
        employees: Vec<String>,
        projects: Vec<String>,
        customers: Vec<String>,
        billable: Option<bool>,
    },

    Respond {
        outcome: String,
        message: String,
        links: Vec<Link>,
        query_specificity: String,
        denial_basis: Option<String>,
    },
}

impl TypedAction {
    /// True for actions that mutate back-office state rather than just read it.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            TypedAction::TimeLog { .. }
                | TypedAction::EmployeesUpdate { .. }
                | TypedAction::ProjectsStatusUpdate { .. }
                | TypedAction::ProjectsTeamUpdate { .. }
                | TypedAction::WikiUpdate { .. }
                | TypedAction::TimeUpdate { .. }
        )
    }

    /// True for read actions that feed `search_entities` tracking.
    pub fn is_search(&self) -> bool {
        matches!(
            self,
            TypedAction::TimeSearch { .. }
                | TypedAction::TimeSummaryByEmployee { .. }
                | TypedAction::TimeSummaryByProject { .. }
        )
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, TypedAction::WhoAmI)
    }

    pub fn is_respond(&self) -> bool {
        matches!(self, TypedAction::Respond { .. })
    }

    /// Canonical tool name and its known aliases, cleared together from
    /// `pending_mutation_tools` on a successful mutation.
    pub fn mutation_tool_aliases(&self) -> &'static [&'static str] {
        match self {
            TypedAction::TimeLog { .. } => &["time_log"],
            TypedAction::EmployeesUpdate { .. } => &["employees_update"],
            TypedAction::ProjectsStatusUpdate { .. } => {
                &["projects_status_update", "projects_update"]
            }
            TypedAction::ProjectsTeamUpdate { .. } => &["projects_team_update", "projects_update"],
            TypedAction::TimeUpdate { .. } => &["time_update"],
            TypedAction::WikiUpdate { .. } => &["wiki_update"],
            _ => &[],
        }
    }
}

/// Known mutation tool names, used by the malformed-action fuzzy match
/// and by the loop/pending-mutation bookkeeping.
pub const MUTATION_TOOL_NAMES: &[&str] = &[
    "projects_update",
    "projects_team_update",
    "projects_status_update",
    "employees_update",
    "time_log",
    "time_update",
    "wiki_update",
];

/// Result of dispatching one `TypedAction` to the back-office (external
/// collaborator; see `ca-backoffice`).
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub results: Vec<String>,
    pub stop_execution: bool,
    pub shared_updates: Map<String, Value>,
}

impl ActionOutcome {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            results: vec![result.into()],
            ..Default::default()
        }
    }

    pub fn failed(result: impl Into<String>) -> Self {
        Self {
            results: vec![format!("FAILED: {}", result.into())],
            ..Default::default()
        }
    }

    pub fn had_error(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.contains("FAILED") || r.contains("ERROR"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_requires_object_with_tool() {
        assert!(ActionRequest::from_value(&serde_json::json!({"tool": "who_am_i"})).is_some());
        assert!(ActionRequest::from_value(&serde_json::json!({"args": {}})).is_none());
        assert!(ActionRequest::from_value(&serde_json::json!("who_am_i")).is_none());
    }

    #[test]
    fn action_request_defaults_missing_args() {
        let req = ActionRequest::from_value(&serde_json::json!({"tool": "who_am_i"})).unwrap();
        assert!(req.args.is_empty());
    }

    #[test]
    fn action_request_flattens_a_flat_form_action() {
        let req = ActionRequest::from_value(&serde_json::json!({
            "tool": "employees_get",
            "id": "emp_x",
        }))
        .unwrap();
        assert_eq!(req.args.get("id").and_then(Value::as_str), Some("emp_x"));
    }

    #[test]
    fn action_request_nested_args_win_over_flat_siblings() {
        let req = ActionRequest::from_value(&serde_json::json!({
            "tool": "employees_get",
            "id": "flat_id",
            "args": {"id": "nested_id"},
        }))
        .unwrap();
        assert_eq!(req.args.get("id").and_then(Value::as_str), Some("nested_id"));
    }

    #[test]
    fn outcome_had_error_detects_failed_or_error_substrings() {
        let outcome = ActionOutcome::failed("timeout");
        assert!(outcome.had_error());
        let outcome = ActionOutcome::ok("done");
        assert!(!outcome.had_error());
    }

    #[test]
    fn mutation_aliases_include_generic_projects_update() {
        let action = TypedAction::ProjectsStatusUpdate {
            id: "proj_x".into(),
            status: "archived".into(),
            changed_by: "alice".into(),
        };
        assert_eq!(
            action.mutation_tool_aliases(),
            &["projects_status_update", "projects_update"]
        );
    }
}
