use serde::{Deserialize, Serialize};

/// Immutable per-task description handed to the Runner at task start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub spec_id: String,
    pub task_text: String,
}
