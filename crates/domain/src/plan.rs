use serde::{Deserialize, Serialize};

use crate::action::ActionRequest;

/// A parsed LLM turn, before any action has been normalized or dispatched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Plan {
    #[serde(default)]
    pub thoughts: String,
    #[serde(default)]
    pub plan: Vec<PlanStep>,
    #[serde(default)]
    pub action_queue: Vec<serde_json::Value>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub step: String,
    pub status: StepStatus,
}

impl Plan {
    /// Action queue entries as raw `ActionRequest`s, dropping any element
    /// that isn't an object (counted as malformed upstream).
    pub fn raw_actions(&self) -> Vec<Option<ActionRequest>> {
        self.action_queue
            .iter()
            .map(ActionRequest::from_value)
            .collect()
    }
}
