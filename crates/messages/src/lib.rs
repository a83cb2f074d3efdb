//! Message Builder (C7): the fixed catalogue of messages sent back to the
//! model across a task — the initial prompt, and one template per retry
//! condition the turn runner can hit.

use ca_domain::Message;
use regex::Regex;

const SYSTEM_PROMPT: &str = "\
You are a back-office assistant for a consulting organization. You answer \
questions about employees, projects, customers, logged time, and the \
internal wiki by calling the tools available to you — never invent data \
you haven't retrieved. Every turn, think briefly, then emit a JSON object \
of the shape {\"thoughts\": \"...\", \"plan\": [...], \"action_queue\": [...], \
\"is_final\": false}. Call the `respond` tool with a terminal outcome and \
`is_final: true` only once you have everything needed to answer, and \
always include the entity IDs you relied on as links.";

const JSON_ERROR_MSG: &str = "[SYSTEM ERROR]: Invalid JSON. Respond with ONLY valid JSON: \
{\"thoughts\": \"...\", \"plan\": [...], \"action_queue\": [...], \"is_final\": false}";

const IS_FINAL_NO_RESPOND_MSG: &str = "[SYSTEM ERROR]: You set is_final=true but didn't call 'respond' tool!\n\n\
Add respond to action_queue:\n\
{\n  \"action_queue\": [{\"tool\": \"respond\", \"args\": {\"outcome\": \"...\", \"message\": \"...\", \"links\": [...]}}],\n  \"is_final\": false\n}";

const LOOP_DETECTED_MSG: &str = "[SYSTEM ERROR]: Loop detected - same actions for 3 turns!\n\n\
This usually means:\n\
1. Feature doesn't exist -> respond 'none_unsupported'\n\
2. Missing info -> respond 'none_clarification_needed'\n\
3. Permissions issue -> respond 'denied_security'\n\n\
STOP repeating and call 'respond' with appropriate outcome.";

const NO_ACTIONS_MSG: &str = "[SYSTEM ERROR]: NO ACTIONS EXECUTED!\n\n\
Your action_queue may have had:\n\
- Malformed JSON\n\
- Unknown tool names\n\
- Missing required fields\n\n\
Please retry with correct syntax.";

const EMPTY_ACTIONS_MSG: &str = "[SYSTEM ERROR]: Empty action_queue but is_final=false!\n\n\
You returned no actions but claim the task is not done. You MUST either:\n\n\
1. TAKE ACTION: add tools to action_queue to continue.\n\
2. USE DATA YOU HAVE: you already collected data - analyze it now and respond.\n\
3. RESPOND: if you have the answer, call respond immediately.\n\n\
DO NOT return empty action_queue again - you will run out of turns!";

fn corrupted_json_message(error: &str) -> String {
    format!(
        "⚠️ [SYSTEM ERROR]: YOUR RESPONSE HAD CORRUPTED OR INVALID JSON!\n\n\
**Error**: {error}\n\n\
**CRITICAL**: Your action_queue was NOT executed because the JSON was corrupted.\n\n\
Your previous response contained invalid characters or incomplete JSON structure.\n\
This can happen when the model hits token limits or generates non-ASCII garbage.\n\n\
**REQUIRED ACTION:**\n\
1. Regenerate your ENTIRE response with valid JSON\n\
2. Make sure all brackets and braces are properly closed\n\
3. Do NOT reference \"previous data\" - your actions did NOT execute\n\n\
⚠️ This turn does NOT count against your budget. Please try again."
    )
}

fn coaching_regex() -> Regex {
    Regex::new(r"(?i)\bcoach(?:es|ing)?\b|\bmentor(?:s|ing)?\b|\bupskill(?:ing)?\b|\bimprove\s+(?:his|her|their)?\s*skills?\b")
        .expect("static regex is valid")
}

fn coaching_urgent_message(remaining_turns: i64) -> String {
    format!(
        "⛔ CRITICAL: COACHING QUERY WITH LOW TURN BUDGET!\n\n\
You have only {remaining_turns} turns remaining and returned empty action_queue!\n\n\
**STOP SEARCHING** — you likely have enough data to respond.\n\n\
**REQUIRED ACTION NOW:** call respond with outcome \"ok_answer\", listing every \
coach you found together with their employee id, and set is_final: true.\n\n\
⚠️ DO NOT return empty action_queue again!\n\
⚠️ DO NOT search again — respond now with the coaches you found!"
    )
}

pub struct MessageBuilder;

impl MessageBuilder {
    /// Build the initial system + task messages, with a turn-budget and
    /// parallel-execution hint appended to the system prompt.
    pub fn build_initial_messages(task_text: &str, wiki_context_summary: &str, max_turns: u32) -> Vec<Message> {
        let turn_budget_hint = format!(
            "\n\n## TURN BUDGET & EFFICIENCY\n\
You have {max_turns} turns to complete this task. Plan efficiently!\n\n\
### Parallel execution\n\
- action_queue accepts MULTIPLE actions — they ALL execute in ONE turn.\n\
- Batch many `projects_get` or `employees_get` calls into one action_queue \
instead of one call per turn.\n\n\
### Batch APIs\n\
- `time_summary_by_employee(employees=[...])` and \
`time_summary_by_project(projects=[...])` return aggregated data for every \
id passed, in one call — prefer them over per-entity loops.\n\n\
### Filters\n\
- Use `department=`, `location=`, `team_employee_id=`, `account_managers=` \
to narrow searches instead of paginating through everything."
        );

        vec![
            Message::system(format!("{SYSTEM_PROMPT}{turn_budget_hint}")),
            Message::user(format!("TASK: {task_text}\n\nContext: {wiki_context_summary}")),
        ]
    }

    pub fn build_json_error_message() -> Message {
        Message::user(JSON_ERROR_MSG)
    }

    /// The corrupted-JSON variant echoes the parser's own error text and
    /// makes explicit that the turn doesn't count against the budget —
    /// otherwise the model tends to hallucinate that its prior actions ran.
    pub fn build_corrupted_json_message(error: &str) -> Message {
        Message::user(corrupted_json_message(error))
    }

    pub fn build_is_final_error_message() -> Message {
        Message::user(IS_FINAL_NO_RESPOND_MSG)
    }

    pub fn build_loop_detected_message() -> Message {
        Message::user(LOOP_DETECTED_MSG)
    }

    pub fn build_no_actions_message() -> Message {
        Message::user(NO_ACTIONS_MSG)
    }

    /// When the model returns an empty queue without `is_final` and the
    /// task reads as a coaching/mentoring query with three or fewer turns
    /// left, escalate to a sharper nudge rather than the generic message.
    pub fn build_empty_actions_message(
        task_text: Option<&str>,
        current_turn: Option<u32>,
        max_turns: Option<u32>,
    ) -> Message {
        let (Some(task_text), Some(current_turn), Some(max_turns)) = (task_text, current_turn, max_turns) else {
            return Message::user(EMPTY_ACTIONS_MSG);
        };

        let remaining = max_turns as i64 - current_turn as i64 - 1;
        if remaining <= 3 && coaching_regex().is_match(task_text) {
            Message::user(coaching_urgent_message(remaining))
        } else {
            Message::user(EMPTY_ACTIONS_MSG)
        }
    }

    pub fn build_malformed_actions_message(malformed_count: usize, mutation_tools: &[String]) -> Message {
        let mutation_warning = if mutation_tools.is_empty() {
            String::new()
        } else {
            format!(
                "\n\nCRITICAL: Malformed mutation(s): {}. NOT executed!",
                mutation_tools.join(", ")
            )
        };
        Message::user(format!(
            "[SYSTEM ERROR]: {malformed_count} action(s) were malformed.\n\n\
Each action MUST have: {{\"tool\": \"tool_name\", \"args\": {{...}}}}{mutation_warning}\n\n\
The malformed actions were NOT executed. Please retry."
        ))
    }

    /// Build the execution-log feedback message, with a turn-budget header
    /// prepended once the remaining budget gets tight.
    pub fn build_results_message(
        results: &[String],
        current_turn: Option<u32>,
        max_turns: Option<u32>,
    ) -> Message {
        if results.is_empty() {
            return Self::build_no_actions_message();
        }

        let feedback = results.join("\n---\n");

        let turn_header = match (current_turn, max_turns) {
            (Some(current_turn), Some(max_turns)) => {
                let remaining = max_turns as i64 - current_turn as i64 - 1;
                if remaining <= 3 {
                    format!(
                        "🛑 [TURN {}/{max_turns}] ONLY {remaining} TURNS LEFT - RESPOND SOON!\n\n",
                        current_turn + 1
                    )
                } else if remaining <= 5 {
                    format!(
                        "⚠️ [TURN {}/{max_turns}] {remaining} turns remaining - start wrapping up\n\n",
                        current_turn + 1
                    )
                } else {
                    String::new()
                }
            }
            _ => String::new(),
        };

        Message::user(format!("{turn_header}[EXECUTION LOG]\n{feedback}"))
    }
}
