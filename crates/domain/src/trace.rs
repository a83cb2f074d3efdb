use serde::Serialize;

/// Structured trace events emitted across the turn loop for machine-parseable
/// telemetry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TurnStarted {
        task_id: String,
        turn: u32,
        max_turns: u32,
    },
    LlmRequest {
        task_id: String,
        node: String,
        attempt: u32,
        duration_ms: u64,
    },
    LlmNodeSwitch {
        task_id: String,
        from_node: String,
        to_node: String,
        reason: String,
    },
    ActionDispatched {
        task_id: String,
        tool: String,
        had_error: bool,
    },
    LoopDetected {
        task_id: String,
        turn: u32,
    },
    TurnFinished {
        task_id: String,
        turn: u32,
        task_done: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "turn_event");
    }
}
