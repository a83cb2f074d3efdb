//! Turn State (C5): the mutable state that accumulates across the actions
//! of a single task — mutation/search tracking, pagination guards, loop
//! hints, and the rename-safe wiki content cache.
//!
//! `TurnState` is owned by the turn runner for the life of a task. The
//! action processor (`ca-runtime`) borrows its fields directly to build
//! each action's `ParseContext` and writes results straight back, rather
//! than round-tripping through a separate snapshot type — there is no
//! batch boundary in this pipeline for a snapshot to usefully sit at,
//! since every action in a turn is parsed and dispatched one at a time
//! against the same live state.

use std::collections::{HashMap, HashSet};

use ca_domain::Link;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub hours: f64,
    pub entries: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationState {
    pub next_offset: u32,
    pub current_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub current_turn: u32,
    pub max_turns: u32,

    pub had_mutations: bool,
    pub mutation_entities: Vec<Link>,
    pub search_entities: Vec<Link>,
    pub fetched_entities: Vec<Link>,
    pub found_project_leads: HashSet<String>,

    pub missing_tools: Vec<String>,
    pub action_types_executed: HashSet<String>,
    pub action_counts: HashMap<String, u32>,
    pub employees_search_queries: Vec<String>,
    pub last_thoughts: String,

    pub outcome_validation_warned: bool,
    pub pending_mutation_tools: HashSet<String>,
    pub query_subject_ids: HashSet<String>,
    pub deleted_wiki_files: HashSet<String>,
    pub loaded_wiki_content: HashMap<String, String>,
    pub loaded_wiki_content_api: HashMap<String, String>,
    pub customer_contacts: HashMap<String, HashMap<String, String>>,
    pub overlap_definitive_hints: HashMap<String, String>,
    pub global_skill_level_tracker: HashMap<String, serde_json::Value>,
    pub global_workload_tracker: HashMap<String, WorkloadEntry>,
    pub pending_pagination: HashMap<String, PaginationState>,

    pub member_projects_batch: HashMap<String, Vec<String>>,
    pub accumulated_project_ids: Vec<String>,
}

impl TurnState {
    pub fn new(max_turns: u32) -> Self {
        Self {
            max_turns,
            ..Default::default()
        }
    }

    /// Reset per-turn scratch at the start of each turn; per-task
    /// accumulators survive.
    pub fn clear_turn_aggregators(&mut self) {
        self.member_projects_batch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_seeds_max_turns_and_leaves_everything_else_default() {
        let state = TurnState::new(20);
        assert_eq!(state.max_turns, 20);
        assert_eq!(state.current_turn, 0);
        assert!(!state.had_mutations);
        assert!(state.pending_pagination.is_empty());
    }

    #[test]
    fn clear_turn_aggregators_resets_member_projects_but_keeps_task_state() {
        let mut state = TurnState::new(20);
        state
            .member_projects_batch
            .insert("jonas_weiss".into(), vec!["proj_atlas".into()]);
        state.accumulated_project_ids.push("proj_atlas".into());
        state.clear_turn_aggregators();
        assert!(state.member_projects_batch.is_empty());
        assert_eq!(state.accumulated_project_ids, vec!["proj_atlas"]);
    }
}
