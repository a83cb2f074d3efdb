//! Process-wide configuration: built-in defaults, overridden by an
//! optional `concierge.toml`, overridden in turn by `CONCIERGE_*`
//! environment variables. Read once at startup; never re-read.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Gonka,
    OpenRouter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "d_max_turns")]
    pub max_turns_per_task: u32,
    #[serde(default = "d_threads")]
    pub threads: usize,
    #[serde(default = "d_retry_attempts")]
    pub llm_retry_attempts: u32,
    #[serde(default)]
    pub benchmark_id: String,
    #[serde(default = "d_workspace")]
    pub workspace: PathBuf,
    #[serde(default = "d_session_name")]
    pub session_name: String,
    #[serde(default = "d_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "d_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "d_max_retries_per_node")]
    pub max_retries_per_node: u32,
    #[serde(default = "d_max_node_switches")]
    pub max_node_switches: u32,
    #[serde(default = "d_loop_history_size")]
    pub loop_history_size: usize,
    #[serde(default = "d_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_turns_per_task: d_max_turns(),
            threads: d_threads(),
            llm_retry_attempts: d_retry_attempts(),
            benchmark_id: String::new(),
            workspace: d_workspace(),
            session_name: d_session_name(),
            api_base_url: d_api_base_url(),
            backend: Backend::default(),
            api_key: None,
            model: None,
            request_timeout_secs: d_request_timeout_secs(),
            max_retries_per_node: d_max_retries_per_node(),
            max_node_switches: d_max_node_switches(),
            loop_history_size: d_loop_history_size(),
            logs_dir: d_logs_dir(),
            log_level: d_log_level(),
        }
    }
}

impl Config {
    /// Load the config from the path named by `CONCIERGE_CONFIG` (default
    /// `concierge.toml`), falling back to built-in defaults when the file
    /// is absent, then apply `CONCIERGE_*` environment overrides.
    pub fn load() -> anyhow::Result<(Self, PathBuf)> {
        let config_path = std::env::var("CONCIERGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("concierge.toml"));

        let mut config = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)
                .map_err(|e| anyhow::anyhow!("reading {}: {e}", config_path.display()))?;
            toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", config_path.display()))?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CONCIERGE_MAX_TURNS_PER_TASK") {
            if let Ok(v) = v.parse() {
                self.max_turns_per_task = v;
            }
        }
        if let Ok(v) = std::env::var("CONCIERGE_THREADS") {
            if let Ok(v) = v.parse() {
                self.threads = v;
            }
        }
        if let Ok(v) = std::env::var("CONCIERGE_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Ok(v) = std::env::var("CONCIERGE_API_KEY") {
            self.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("CONCIERGE_MODEL") {
            self.model = Some(v);
        }
        if let Ok(v) = std::env::var("CONCIERGE_BACKEND") {
            self.backend = match v.to_ascii_lowercase().as_str() {
                "openrouter" => Backend::OpenRouter,
                _ => Backend::Gonka,
            };
        }
        if let Ok(v) = std::env::var("CONCIERGE_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}

fn d_max_turns() -> u32 {
    20
}
fn d_threads() -> usize {
    1
}
fn d_retry_attempts() -> u32 {
    3
}
fn d_workspace() -> PathBuf {
    PathBuf::from(".")
}
fn d_session_name() -> String {
    "default".to_string()
}
fn d_api_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn d_request_timeout_secs() -> u64 {
    30
}
fn d_max_retries_per_node() -> u32 {
    3
}
fn d_max_node_switches() -> u32 {
    10
}
fn d_loop_history_size() -> usize {
    3
}
fn d_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn d_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_configuration_surface() {
        let config = Config::default();
        assert_eq!(config.max_turns_per_task, 20);
        assert_eq!(config.threads, 1);
        assert_eq!(config.backend, Backend::Gonka);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        std::env::remove_var("CONCIERGE_CONFIG");
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CONCIERGE_CONFIG", dir.path().join("nonexistent.toml"));
        let (config, _path) = Config::load().unwrap();
        assert_eq!(config.threads, 1);
        std::env::remove_var("CONCIERGE_CONFIG");
    }

    #[test]
    fn env_override_beats_defaults() {
        std::env::set_var("CONCIERGE_THREADS", "4");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.threads, 4);
        std::env::remove_var("CONCIERGE_THREADS");
    }
}
