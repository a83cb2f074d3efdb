//! LLM Invoker (C6): a synchronous-from-the-caller's-view chat completion
//! call with automatic node failover, modeled as a small state machine
//! over `TryingNode` / `SwitchingNode` / `Exhausted`.

mod node;
mod wire;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ca_domain::{Message, UsageSample};
use parking_lot::Mutex;
use regex::Regex;
use thiserror::Error;

pub use node::{GenesisDirectory, NodeDirectory, GENESIS_NODES};

#[derive(Debug, Error)]
pub enum InvokerError {
    #[error("all nodes exhausted, last error: {0}")]
    AllNodesExhausted(String),
}

#[async_trait]
pub trait LlmInvoker: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<(String, UsageSample), InvokerError>;
}

#[derive(Debug, Clone)]
enum NodeState {
    TryingNode { retries_left: u32 },
    SwitchingNode,
    Exhausted,
}

enum CallOutcome {
    Fatal(String),
    Transient(String),
}

const CRITICAL_ERROR_PATTERNS: &[&str] = &[
    "connection aborted",
    "remote end closed",
    "connection refused",
    "connect timeout",
    "connecttimeouterror",
    "remotedisconnected",
    "transfer agent capacity reached",
    "429",
    "unable to validate request",
    "invalid signature",
    "signature",
    "read timeout",
    "request timeout",
    "timed out",
];

fn classify(text: &str) -> CallOutcome {
    let lower = text.to_lowercase();
    if CRITICAL_ERROR_PATTERNS.iter().any(|p| lower.contains(p)) {
        CallOutcome::Fatal(text.to_string())
    } else {
        CallOutcome::Transient(text.to_string())
    }
}

fn hint_url_regex() -> Regex {
    Regex::new(r"https?://[^\s\)\]\"']+").expect("static regex is valid")
}

fn extract_hint_url(error_text: &str) -> Option<String> {
    hint_url_regex()
        .find(error_text)
        .map(|m| m.as_str().to_string())
}

pub struct GonkaInvokerConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub fixed_node: Option<String>,
    pub max_retries_per_node: u32,
    pub max_node_switches: u32,
    pub request_timeout: Duration,
}

impl Default for GonkaInvokerConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            api_key: None,
            fixed_node: None,
            max_retries_per_node: 3,
            max_node_switches: 10,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// A chat-completion invoker against any OpenAI-compatible node, with
/// automatic failover across a directory of candidate nodes.
pub struct GonkaInvoker {
    client: reqwest::Client,
    directory: Box<dyn NodeDirectory>,
    config: GonkaInvokerConfig,
    current_node: Mutex<Option<String>>,
}

impl GonkaInvoker {
    pub fn new(config: GonkaInvokerConfig, directory: Box<dyn NodeDirectory>) -> Self {
        Self {
            client: reqwest::Client::new(),
            directory,
            config,
            current_node: Mutex::new(None),
        }
    }

    async fn ensure_node(&self) -> String {
        if let Some(node) = self.current_node.lock().clone() {
            return node;
        }
        let node = if let Some(fixed) = &self.config.fixed_node {
            fixed.clone()
        } else {
            self.directory
                .list_nodes()
                .await
                .into_iter()
                .next()
                .unwrap_or_else(|| GENESIS_NODES[0].to_string())
        };
        *self.current_node.lock() = Some(node.clone());
        node
    }

    async fn call_node(
        &self,
        node: &str,
        messages: &[wire::WireMessage],
    ) -> Result<(String, UsageSample), CallOutcome> {
        let body = wire::ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            temperature: 0.0,
        };
        let url = format!("{}/v1/chat/completions", node.trim_end_matches('/'));
        let mut req = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| classify(&e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(classify(&format!("{status} {text}")));
        }

        let parsed: wire::ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| CallOutcome::Transient(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        let usage = match parsed.usage {
            Some(u) if u.total_tokens > 0 => UsageSample {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
                estimated: false,
            },
            _ => UsageSample::estimate(prompt_chars, content.len()),
        };

        Ok((content, usage))
    }
}

#[async_trait]
impl LlmInvoker for GonkaInvoker {
    async fn invoke(&self, messages: &[Message]) -> Result<(String, UsageSample), InvokerError> {
        let wire_messages = wire::to_wire_messages(messages);
        let mut node = self.ensure_node().await;
        let mut tried = HashSet::new();
        tried.insert(node.clone());

        let mut state = NodeState::TryingNode {
            retries_left: self.config.max_retries_per_node,
        };
        let mut switches = 0u32;
        let mut last_error = String::new();

        loop {
            match state {
                NodeState::TryingNode { retries_left } => {
                    match self.call_node(&node, &wire_messages).await {
                        Ok((text, usage)) => return Ok((text, usage)),
                        Err(CallOutcome::Fatal(msg)) => {
                            last_error = msg;
                            state = NodeState::SwitchingNode;
                        }
                        Err(CallOutcome::Transient(msg)) => {
                            last_error = msg;
                            if retries_left > 1 {
                                let attempt = self.config.max_retries_per_node - retries_left;
                                tokio::time::sleep(Duration::from_secs(2 * (attempt as u64 + 1)))
                                    .await;
                                state = NodeState::TryingNode {
                                    retries_left: retries_left - 1,
                                };
                            } else {
                                state = NodeState::SwitchingNode;
                            }
                        }
                    }
                }
                NodeState::SwitchingNode => {
                    switches += 1;
                    if switches > self.config.max_node_switches {
                        state = NodeState::Exhausted;
                        continue;
                    }
                    let available = self.directory.list_nodes().await;
                    let hint = extract_hint_url(&last_error).filter(|h| !tried.contains(h));
                    let next = hint.or_else(|| node::pick_unused(&available, &tried));
                    match next {
                        Some(next_node) => {
                            tracing::info!(
                                from_node = %node,
                                to_node = %next_node,
                                reason = %last_error,
                                "switching llm node"
                            );
                            tried.insert(next_node.clone());
                            node = next_node.clone();
                            *self.current_node.lock() = Some(next_node);
                            state = NodeState::TryingNode {
                                retries_left: self.config.max_retries_per_node,
                            };
                        }
                        None => state = NodeState::Exhausted,
                    }
                }
                NodeState::Exhausted => {
                    return Err(InvokerError::AllNodesExhausted(last_error));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_connection_errors_as_fatal() {
        assert!(matches!(
            classify("Connection aborted by peer"),
            CallOutcome::Fatal(_)
        ));
        assert!(matches!(classify("429 too many requests"), CallOutcome::Fatal(_)));
    }

    #[test]
    fn classifies_generic_errors_as_transient() {
        assert!(matches!(
            classify("internal server error"),
            CallOutcome::Transient(_)
        ));
    }

    #[test]
    fn extracts_hint_url_from_error_text() {
        let hint = extract_hint_url("failed to reach https://node7.gonka.network/v1 : refused");
        assert_eq!(hint, Some("https://node7.gonka.network/v1".to_string()));
    }

    #[test]
    fn no_hint_url_returns_none() {
        assert_eq!(extract_hint_url("generic timeout"), None);
    }
}
