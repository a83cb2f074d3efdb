//! Per-run failure log: one JSON file and one text summary per failed
//! task, written under `logs/run_<timestamp>/`. Append-only, mutex-guarded
//! so concurrent workers can report failures without interleaving writes.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct FailureRecord<'a> {
    pub spec_id: &'a str,
    pub task_id: &'a str,
    pub turns_used: u32,
    pub reason: &'a str,
    pub transcript_tail: &'a [String],
}

/// Writes `failure_<nn>_<spec>.json` / `..._summary.txt` pairs into a
/// single run directory, numbering failures as they arrive.
pub struct FailureLogger {
    run_dir: PathBuf,
    next_index: Mutex<u32>,
}

impl FailureLogger {
    /// Create (and ensure on disk) the run directory `logs_dir/run_<timestamp>`.
    pub fn new(logs_dir: &Path, run_timestamp: &str) -> std::io::Result<Self> {
        let run_dir = logs_dir.join(format!("run_{run_timestamp}"));
        std::fs::create_dir_all(&run_dir)?;
        Ok(Self {
            run_dir,
            next_index: Mutex::new(0),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Append a failure record, returning the index it was written under.
    pub fn log_failure(&self, record: &FailureRecord<'_>) -> std::io::Result<u32> {
        let index = {
            let mut next = self.next_index.lock();
            let index = *next;
            *next += 1;
            index
        };

        let json_path = self.run_dir.join(format!("failure_{index:02}_{}.json", record.spec_id));
        let summary_path = self.run_dir.join(format!("failure_{index:02}_{}_summary.txt", record.spec_id));

        let json = serde_json::to_string_pretty(record).unwrap_or_default();
        std::fs::write(&json_path, json)?;

        let summary = format!(
            "task {} ({}) failed after {} turn(s): {}\n",
            record.task_id, record.spec_id, record.turns_used, record.reason
        );
        std::fs::write(&summary_path, summary)?;

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_json_and_summary_pair_per_failure() {
        let dir = tempfile::tempdir().unwrap();
        let logger = FailureLogger::new(dir.path(), "20260729-000000").unwrap();

        let idx = logger
            .log_failure(&FailureRecord {
                spec_id: "spec_007",
                task_id: "t1",
                turns_used: 20,
                reason: "turn budget exhausted without a terminal response",
                transcript_tail: &[],
            })
            .unwrap();

        assert_eq!(idx, 0);
        let json_path = logger.run_dir().join("failure_00_spec_007.json");
        let summary_path = logger.run_dir().join("failure_00_spec_007_summary.txt");
        assert!(json_path.exists());
        assert!(summary_path.exists());
        assert!(std::fs::read_to_string(summary_path).unwrap().contains("20 turn"));
    }

    #[test]
    fn indices_increase_across_concurrent_failures() {
        let dir = tempfile::tempdir().unwrap();
        let logger = FailureLogger::new(dir.path(), "20260729-000000").unwrap();
        for expected in 0..3 {
            let idx = logger
                .log_failure(&FailureRecord {
                    spec_id: "spec",
                    task_id: "t",
                    turns_used: 1,
                    reason: "x",
                    transcript_tail: &[],
                })
                .unwrap();
            assert_eq!(idx, expected);
        }
    }
}
