//! Session-wide counters and per-task samples, shared by every worker and
//! guarded by a single mutex. Never held across an `.await`: each worker
//! snapshots what it needs, releases the lock, does its I/O, then
//! re-acquires to commit the result.

use std::collections::HashMap;

use ca_domain::UsageSample;
use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct TaskSample {
    pub task_id: String,
    pub turns_used: u32,
    pub task_done: bool,
    pub usage: UsageSample,
}

#[derive(Debug, Default)]
struct Inner {
    tasks_started: u64,
    tasks_completed: u64,
    tasks_failed: u64,
    max_concurrency_seen: usize,
    current_concurrency: usize,
    samples: HashMap<String, TaskSample>,
}

/// Process-wide accumulator for the worker pool's run.
#[derive(Debug, Default)]
pub struct SessionStats {
    inner: Mutex<Inner>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_started(&self) {
        let mut inner = self.inner.lock();
        inner.tasks_started += 1;
        inner.current_concurrency += 1;
        inner.max_concurrency_seen = inner.max_concurrency_seen.max(inner.current_concurrency);
    }

    pub fn task_finished(&self, sample: TaskSample, succeeded: bool) {
        let mut inner = self.inner.lock();
        inner.current_concurrency = inner.current_concurrency.saturating_sub(1);
        if succeeded {
            inner.tasks_completed += 1;
        } else {
            inner.tasks_failed += 1;
        }
        inner.samples.insert(sample.task_id.clone(), sample);
    }

    pub fn snapshot(&self) -> SessionStatsSnapshot {
        let inner = self.inner.lock();
        SessionStatsSnapshot {
            tasks_started: inner.tasks_started,
            tasks_completed: inner.tasks_completed,
            tasks_failed: inner.tasks_failed,
            max_concurrency_seen: inner.max_concurrency_seen,
            samples: inner.samples.values().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStatsSnapshot {
    pub tasks_started: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub max_concurrency_seen: usize,
    pub samples: Vec<TaskSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_max_concurrency_across_overlapping_tasks() {
        let stats = SessionStats::new();
        stats.task_started();
        stats.task_started();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.max_concurrency_seen, 2);

        stats.task_finished(
            TaskSample {
                task_id: "t1".into(),
                turns_used: 3,
                task_done: true,
                usage: UsageSample::default(),
            },
            true,
        );
        stats.task_started();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.max_concurrency_seen, 2);
        assert_eq!(snapshot.tasks_completed, 1);
    }

    #[test]
    fn failed_tasks_are_counted_separately() {
        let stats = SessionStats::new();
        stats.task_started();
        stats.task_finished(
            TaskSample {
                task_id: "t1".into(),
                turns_used: 20,
                task_done: false,
                usage: UsageSample::default(),
            },
            false,
        );
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.tasks_completed, 0);
    }
}
