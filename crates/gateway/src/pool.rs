//! Worker Pool (C10): one bounded-concurrency Tokio task per `TaskDescriptor`,
//! each owning its own back-office HTTP client and LLM invoker. "OS thread
//! per task" becomes a `Semaphore`-gated `JoinSet`; shared counters and the
//! failure log live behind `parking_lot::Mutex` and are never held across
//! an `.await`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ca_backoffice::{BackOffice, HttpBackOffice, HttpBackOfficeConfig};
use ca_domain::TaskDescriptor;
use ca_providers::{GenesisDirectory, GonkaInvoker, GonkaInvokerConfig};
use ca_runtime::run_task;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::{Backend, Config};
use crate::failure_logger::{FailureLogger, FailureRecord};
use crate::session_stats::{SessionStats, SessionStatsSnapshot, TaskSample};
use crate::task_log::TaskLogWriter;

pub struct WorkerPool {
    config: Arc<Config>,
    stats: Arc<SessionStats>,
    failure_logger: Arc<FailureLogger>,
    parallel_logs_dir: PathBuf,
}

impl WorkerPool {
    pub fn new(config: Arc<Config>, failure_logger: Arc<FailureLogger>, parallel_logs_dir: PathBuf) -> Self {
        Self {
            config,
            stats: Arc::new(SessionStats::new()),
            failure_logger,
            parallel_logs_dir,
        }
    }

    /// Run every task to completion, bounded to `config.threads` concurrent
    /// tasks. Ordering between tasks is not guaranteed.
    pub async fn run(&self, tasks: Vec<TaskDescriptor>, wiki_context_summary: Arc<String>) -> SessionStatsSnapshot {
        let permits = self.config.threads.max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        std::fs::create_dir_all(&self.parallel_logs_dir).ok();

        let mut joins = JoinSet::new();
        for task in tasks {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            let config = self.config.clone();
            let stats = self.stats.clone();
            let failure_logger = self.failure_logger.clone();
            let wiki_context_summary = wiki_context_summary.clone();
            let log_path = self.parallel_logs_dir.join(format!("{}.log", task.spec_id));

            let span = tracing::info_span!("task", spec_id = %task.spec_id, task_id = %task.task_id);
            joins.spawn(
                async move {
                    let _permit = permit;
                    run_one_task(config, stats, failure_logger, task, wiki_context_summary, log_path).await;
                }
                .instrument(span),
            );
        }

        while joins.join_next().await.is_some() {}
        self.stats.snapshot()
    }
}

async fn run_one_task(
    config: Arc<Config>,
    stats: Arc<SessionStats>,
    failure_logger: Arc<FailureLogger>,
    task: TaskDescriptor,
    wiki_context_summary: Arc<String>,
    log_path: PathBuf,
) {
    stats.task_started();
    tracing::info!(spec_id = %task.spec_id, "task started");

    let mut log = TaskLogWriter::create(&log_path).ok();
    if let Some(log) = &mut log {
        log.write_line(&format!("task {} ({}) started", task.task_id, task.spec_id));
    }

    let backoffice: Box<dyn BackOffice> = Box::new(HttpBackOffice::new(HttpBackOfficeConfig {
        base_url: config.api_base_url.clone(),
        api_key: config.api_key.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    }));
    let invoker = GonkaInvoker::new(
        GonkaInvokerConfig {
            model: config.model.clone().unwrap_or_else(|| "default".to_string()),
            api_key: config.api_key.clone(),
            fixed_node: match config.backend {
                Backend::OpenRouter => Some(config.api_base_url.clone()),
                Backend::Gonka => None,
            },
            max_retries_per_node: config.max_retries_per_node,
            max_node_switches: config.max_node_switches,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        },
        Box::new(GenesisDirectory),
    );

    let result = run_task(
        &task,
        &wiki_context_summary,
        config.max_turns_per_task,
        &invoker,
        backoffice.as_ref(),
    )
    .await;

    if let Some(log) = &mut log {
        log.write_line(&format!(
            "task {} finished: done={} turns={} tokens={}",
            task.task_id, result.task_done, result.turns_used, result.total_usage.total_tokens
        ));
    }

    let sample = TaskSample {
        task_id: task.task_id.clone(),
        turns_used: result.turns_used,
        task_done: result.task_done,
        usage: result.total_usage,
    };

    if result.task_done {
        tracing::info!(spec_id = %task.spec_id, turns = result.turns_used, "task completed");
        stats.task_finished(sample, true);
    } else {
        let reason = "turn budget exhausted without a terminal response";
        tracing::warn!(spec_id = %task.spec_id, turns = result.turns_used, "task did not complete");
        stats.task_finished(sample, false);

        let transcript_tail: Vec<String> = result
            .transcript
            .iter()
            .rev()
            .take(5)
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .rev()
            .collect();

        if let Err(e) = failure_logger.log_failure(&FailureRecord {
            spec_id: &task.spec_id,
            task_id: &task.task_id,
            turns_used: result.turns_used,
            reason,
            transcript_tail: &transcript_tail,
        }) {
            tracing::error!(spec_id = %task.spec_id, error = %e, "failed to write failure log");
        }
    }
}
