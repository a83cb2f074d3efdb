//! Batch runner (C10): loads a layered config, fans a list of tasks out
//! across a bounded worker pool, and writes the per-run logs and failure
//! reports the rest of the system produces artefacts into.

mod bootstrap;
mod config;
mod failure_logger;
mod pool;
mod session_stats;
mod task_log;
mod wiki_cache;

pub mod cli;

pub use bootstrap::summarize_wiki;
pub use config::{Backend, Config};
pub use failure_logger::{FailureLogger, FailureRecord};
pub use pool::WorkerPool;
pub use session_stats::{SessionStats, SessionStatsSnapshot, TaskSample};
pub use task_log::TaskLogWriter;
pub use wiki_cache::WikiCache;
