//! The three subcommands this binary exposes: `run` a single task, `serve`
//! a queue of tasks through the worker pool, and `doctor` to sanity-check
//! configuration without doing any work.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ca_backoffice::{BackOffice, HttpBackOffice, HttpBackOfficeConfig};
use ca_domain::TaskDescriptor;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::failure_logger::FailureLogger;
use crate::pool::WorkerPool;
use crate::summarize_wiki;

#[derive(Debug, Parser)]
#[command(name = "concierge", about = "Autonomous back-office task runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single task described by a JSON file (one `TaskDescriptor` object).
    Run {
        #[arg(long)]
        task: PathBuf,
    },
    /// Run every task in a JSON array through the bounded worker pool.
    Serve {
        #[arg(long)]
        tasks: PathBuf,
    },
    /// Load and validate configuration, then print it, without running anything.
    Doctor,
}

fn load_task(path: &Path) -> Result<TaskDescriptor> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing task file {}", path.display()))
}

fn load_tasks(path: &Path) -> Result<Vec<TaskDescriptor>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing task queue {}", path.display()))
}

fn backoffice_for(config: &Config) -> HttpBackOffice {
    HttpBackOffice::new(HttpBackOfficeConfig {
        base_url: config.api_base_url.clone(),
        api_key: config.api_key.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    })
}

fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Doctor => {
            let (config, path) = Config::load()?;
            println!("loaded configuration from {}", path.display());
            println!("{config:#?}");
            Ok(())
        }
        Command::Run { task } => {
            let (config, _) = Config::load()?;
            let config = Arc::new(config);
            let descriptor = load_task(&task)?;

            let timestamp = run_timestamp();
            let failure_logger = Arc::new(FailureLogger::new(&config.logs_dir, &timestamp)?);
            let parallel_logs_dir = config.logs_dir.join(format!("parallel_{timestamp}"));

            let api = backoffice_for(&config);
            let wiki_context_summary = Arc::new(summarize_wiki(&api).await);

            let pool = WorkerPool::new(config, failure_logger, parallel_logs_dir);
            let snapshot = pool.run(vec![descriptor], wiki_context_summary).await;
            println!("{snapshot:#?}");
            Ok(())
        }
        Command::Serve { tasks } => {
            let (config, _) = Config::load()?;
            let config = Arc::new(config);
            let descriptors = load_tasks(&tasks)?;

            let timestamp = run_timestamp();
            let failure_logger = Arc::new(FailureLogger::new(&config.logs_dir, &timestamp)?);
            let parallel_logs_dir = config.logs_dir.join(format!("parallel_{timestamp}"));

            let api = backoffice_for(&config);
            let wiki_context_summary = Arc::new(summarize_wiki(&api).await);

            let pool = WorkerPool::new(config, failure_logger, parallel_logs_dir);
            let snapshot = pool.run(descriptors, wiki_context_summary).await;
            println!("{snapshot:#?}");
            Ok(())
        }
    }
}
