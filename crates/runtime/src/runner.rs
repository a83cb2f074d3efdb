//! Turn Runner (C9): the per-task loop wiring the LLM invoker, response
//! parser, loop detector, and action processor together.

use ca_backoffice::BackOffice;
use ca_domain::{Message, TaskDescriptor, TraceEvent, UsageSample};
use ca_messages::MessageBuilder;
use ca_parsing::{parse_llm_response, ParseOutcome as PlanOutcome};
use ca_providers::LlmInvoker;
use ca_turnstate::TurnState;
use chrono::NaiveDate;

use crate::loop_detector::LoopDetector;
use crate::lookup::BackOfficeEmployeeLookup;
use crate::processor;

/// Everything the caller needs to know about how a task ended.
#[derive(Debug, Clone)]
pub struct TaskRunResult {
    pub task_done: bool,
    pub turns_used: u32,
    pub total_usage: UsageSample,
    pub transcript: Vec<Message>,
}

/// Fallback "today" when `who_am_i` can't be reached at all — an outage,
/// not a real simulated date, so any date-dependent default downstream is
/// a best-effort placeholder rather than a meaningful answer.
fn fallback_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

/// Run one task to completion (or until the turn budget is exhausted).
///
/// Identity is resolved once up front via a direct `who_am_i` call, purely
/// to seed `current_user`/`today` for every action parse this task — this
/// is a data-availability fetch, independent of the `who_am_i_called` flag
/// the action processor still requires the *model* to set explicitly
/// before accepting a terminal response.
pub async fn run_task(
    task: &TaskDescriptor,
    wiki_context_summary: &str,
    max_turns: u32,
    invoker: &dyn LlmInvoker,
    backoffice: &dyn BackOffice,
) -> TaskRunResult {
    let identity = backoffice.who_am_i().await.ok();
    let current_user = identity.as_ref().and_then(|i| i.user_id.clone());
    let today = identity.as_ref().map(|i| i.today).unwrap_or_else(fallback_today);

    let lookup = BackOfficeEmployeeLookup::new(backoffice);
    let mut state = TurnState::new(max_turns);
    let mut messages = MessageBuilder::build_initial_messages(&task.task_text, wiki_context_summary, max_turns);
    let mut loop_detector = LoopDetector::new();
    let mut who_am_i_called = false;
    let mut task_done = false;
    let mut total_usage = UsageSample::default();
    let mut turns_used = 0;

    for turn in 0..max_turns {
        if task_done {
            break;
        }
        turns_used = turn + 1;
        state.current_turn = turn;
        state.clear_turn_aggregators();
        TraceEvent::TurnStarted {
            task_id: task.task_id.clone(),
            turn,
            max_turns,
        }
        .emit();

        let (raw, usage) = match invoker.invoke(&messages).await {
            Ok(pair) => pair,
            Err(_) => break,
        };
        total_usage.accumulate(&usage);

        let plan = match parse_llm_response(&raw) {
            PlanOutcome::Parsed(plan) => plan,
            PlanOutcome::Failed(failure) => {
                messages.push(Message::assistant(raw));
                messages.push(if failure.corruption_detected {
                    MessageBuilder::build_corrupted_json_message(&failure.reason)
                } else {
                    MessageBuilder::build_json_error_message()
                });
                continue;
            }
        };

        state.last_thoughts = plan.thoughts.clone();

        let (valid, malformed, malformed_mutation_tools) =
            processor::validate_shape(&plan.action_queue, &mut state.pending_mutation_tools);

        if malformed > 0 {
            messages.push(MessageBuilder::build_malformed_actions_message(
                malformed,
                &malformed_mutation_tools,
            ));
            if valid.is_empty() {
                continue;
            }
        }

        messages.push(Message::assistant(raw));

        if plan.is_final && valid.is_empty() {
            messages.push(MessageBuilder::build_is_final_error_message());
            continue;
        }

        if loop_detector.record_and_check(&valid) {
            TraceEvent::LoopDetected {
                task_id: task.task_id.clone(),
                turn,
            }
            .emit();
            messages.push(MessageBuilder::build_loop_detected_message());
            continue;
        }

        let result = processor::process(
            &valid,
            &mut state,
            who_am_i_called,
            current_user.as_deref(),
            today,
            backoffice,
            &lookup,
        )
        .await;
        who_am_i_called = result.who_am_i_called;

        if !result.results.is_empty() {
            messages.push(MessageBuilder::build_results_message(
                &result.results,
                Some(turn),
                Some(max_turns),
            ));
        } else if !plan.is_final && valid.is_empty() {
            messages.push(MessageBuilder::build_empty_actions_message(
                Some(&task.task_text),
                Some(turn),
                Some(max_turns),
            ));
        } else {
            messages.push(MessageBuilder::build_no_actions_message());
        }

        task_done = result.task_done;

        TraceEvent::TurnFinished {
            task_id: task.task_id.clone(),
            turn,
            task_done,
        }
        .emit();
    }

    TaskRunResult {
        task_done,
        turns_used,
        total_usage,
        transcript: messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ca_backoffice::MockBackOffice;
    use ca_domain::Identity;
    use ca_providers::InvokerError;
    use parking_lot::Mutex;

    struct ScriptedInvoker {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedInvoker {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).rev().collect()),
            }
        }
    }

    #[async_trait]
    impl LlmInvoker for ScriptedInvoker {
        async fn invoke(&self, _messages: &[Message]) -> Result<(String, UsageSample), InvokerError> {
            let mut responses = self.responses.lock();
            match responses.pop() {
                Some(r) => Ok((r, UsageSample::default())),
                None => Err(InvokerError::AllNodesExhausted("script exhausted".into())),
            }
        }
    }

    fn task() -> TaskDescriptor {
        TaskDescriptor {
            task_id: "t1".into(),
            spec_id: "spec".into(),
            task_text: "who manages jonas_weiss?".into(),
        }
    }

    fn identity() -> Identity {
        let mut identity = Identity::public(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "hash".into());
        identity.user_id = Some("alice".into());
        identity
    }

    #[tokio::test]
    async fn completes_task_after_who_am_i_then_respond() {
        let api = MockBackOffice::new(identity());
        let invoker = ScriptedInvoker::new(vec![
            r#"{"thoughts":"id","plan":[],"action_queue":[{"tool":"who_am_i","args":{}}],"is_final":false}"#,
            r#"{"thoughts":"done","plan":[],"action_queue":[{"tool":"respond","args":{"outcome":"ok_answer","message":"No manager on file."}}],"is_final":true}"#,
        ]);

        let result = run_task(&task(), "no wiki pages", 10, &invoker, &api).await;
        assert!(result.task_done);
        assert_eq!(result.turns_used, 2);
    }

    #[tokio::test]
    async fn respond_without_who_am_i_keeps_task_open_and_retries() {
        let api = MockBackOffice::new(identity());
        let invoker = ScriptedInvoker::new(vec![
            r#"{"thoughts":"oops","plan":[],"action_queue":[{"tool":"respond","args":{"outcome":"ok_answer","message":"Done."}}],"is_final":true}"#,
            r#"{"thoughts":"retry","plan":[],"action_queue":[{"tool":"who_am_i","args":{}}],"is_final":false}"#,
            r#"{"thoughts":"done","plan":[],"action_queue":[{"tool":"respond","args":{"outcome":"ok_answer","message":"Done now."}}],"is_final":true}"#,
        ]);

        let result = run_task(&task(), "no wiki pages", 10, &invoker, &api).await;
        assert!(result.task_done);
        assert_eq!(result.turns_used, 3);
    }

    #[tokio::test]
    async fn invoker_exhaustion_ends_the_task_without_completion() {
        let api = MockBackOffice::new(identity());
        let invoker = ScriptedInvoker::new(vec![]);
        let result = run_task(&task(), "no wiki pages", 5, &invoker, &api).await;
        assert!(!result.task_done);
        assert_eq!(result.turns_used, 1);
    }

    #[tokio::test]
    async fn malformed_json_retries_instead_of_aborting() {
        let api = MockBackOffice::new(identity());
        let invoker = ScriptedInvoker::new(vec![
            "not json at all",
            r#"{"thoughts":"id","plan":[],"action_queue":[{"tool":"who_am_i","args":{}}],"is_final":false}"#,
            r#"{"thoughts":"done","plan":[],"action_queue":[{"tool":"respond","args":{"outcome":"ok_answer","message":"Done."}}],"is_final":true}"#,
        ]);
        let result = run_task(&task(), "no wiki pages", 10, &invoker, &api).await;
        assert!(result.task_done);
        assert_eq!(result.turns_used, 3);
    }
}
