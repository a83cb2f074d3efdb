//! Per-task log file under `logs/parallel_<timestamp>/<spec_id>.log`.
//!
//! A genuine thread-local stdout dispatcher (the original's rendition)
//! doesn't carry across `.await` points, and routing the process-wide
//! `tracing` subscriber per-span to a dynamic set of files is more
//! machinery than one line-per-task detail is worth. Each worker instead
//! writes its own short, timestamp-free detail lines directly to its log
//! file; the short status lines the console sees still go through the
//! normal process-wide `tracing` subscriber.

use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct TaskLogWriter {
    file: File,
}

impl TaskLogWriter {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self { file: File::create(path)? })
    }

    pub fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.file, "{line}") {
            tracing::warn!(error = %e, "failed to write task log line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_lines_to_the_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec_001.log");
        let mut writer = TaskLogWriter::create(&path).unwrap();
        writer.write_line("task started");
        writer.write_line("task finished: done=true turns=2");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "task started\ntask finished: done=true turns=2\n");
    }
}
