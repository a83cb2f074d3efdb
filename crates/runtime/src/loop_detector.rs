//! Loop Detector (C4): catches a model stuck repeating the same action
//! pattern turn after turn.

use std::collections::{BTreeMap, VecDeque};

use ca_domain::ActionRequest;
use serde_json::Value;

const WINDOW: usize = 3;

/// A turn's actions reduced to a comparable shape: tool name paired with
/// its argument map sorted by key, so two calls with the same arguments in
/// a different JSON key order collapse to the same pattern. The action
/// *sequence* within a turn is not reordered — only isn't lost either — so
/// `[get(a), get(b)]` and `[get(b), get(a)]` are different patterns.
pub type ActionPattern = Vec<(String, BTreeMap<String, Value>)>;

fn pattern_of(actions: &[ActionRequest]) -> ActionPattern {
    actions
        .iter()
        .map(|a| (a.tool.clone(), a.args.clone().into_iter().collect()))
        .collect()
}

/// FIFO of the last `WINDOW` turns' action patterns. Fires when the FIFO is
/// full, the newest pattern is non-empty, and every entry equals it.
#[derive(Debug, Default)]
pub struct LoopDetector {
    recent: VecDeque<ActionPattern>,
}

impl LoopDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this turn's actions and report whether a loop just triggered.
    /// On trigger, clears the FIFO so the next turns start a fresh window.
    pub fn record_and_check(&mut self, actions: &[ActionRequest]) -> bool {
        let pattern = pattern_of(actions);

        self.recent.push_back(pattern.clone());
        if self.recent.len() > WINDOW {
            self.recent.pop_front();
        }

        let triggered = !pattern.is_empty()
            && self.recent.len() == WINDOW
            && self.recent.iter().all(|p| *p == pattern);

        if triggered {
            self.recent.clear();
        }
        triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(tool: &str, args: Value) -> ActionRequest {
        ActionRequest {
            tool: tool.to_string(),
            args: args.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn does_not_trigger_before_window_is_full() {
        let mut detector = LoopDetector::new();
        let actions = vec![action("employees_get", json!({"id": "jonas_weiss"}))];
        assert!(!detector.record_and_check(&actions));
        assert!(!detector.record_and_check(&actions));
    }

    #[test]
    fn triggers_on_three_identical_turns() {
        let mut detector = LoopDetector::new();
        let actions = vec![action("employees_get", json!({"id": "jonas_weiss"}))];
        assert!(!detector.record_and_check(&actions));
        assert!(!detector.record_and_check(&actions));
        assert!(detector.record_and_check(&actions));
    }

    #[test]
    fn clears_after_triggering() {
        let mut detector = LoopDetector::new();
        let actions = vec![action("employees_get", json!({"id": "jonas_weiss"}))];
        for _ in 0..3 {
            detector.record_and_check(&actions);
        }
        assert!(!detector.record_and_check(&actions));
    }

    #[test]
    fn does_not_trigger_for_empty_action_queue() {
        let mut detector = LoopDetector::new();
        for _ in 0..5 {
            assert!(!detector.record_and_check(&[]));
        }
    }

    #[test]
    fn differing_entity_ids_do_not_count_as_a_loop() {
        let mut detector = LoopDetector::new();
        detector.record_and_check(&[action("employees_get", json!({"id": "a"}))]);
        detector.record_and_check(&[action("employees_get", json!({"id": "b"}))]);
        assert!(!detector.record_and_check(&[action("employees_get", json!({"id": "c"}))]));
    }

    #[test]
    fn key_order_within_one_action_does_not_matter() {
        let mut detector = LoopDetector::new();
        let a = vec![action("employees_get", json!({"id": "x", "limit": 5}))];
        let b = vec![action("employees_get", json!({"limit": 5, "id": "x"}))];
        detector.record_and_check(&a);
        detector.record_and_check(&b);
        assert!(detector.record_and_check(&a));
    }
}
