//! Node directory: where the invoker looks for candidate back-end URLs
//! when it needs to switch away from a failing one.

use async_trait::async_trait;

/// A small set of well-known nodes to fall back to when no live directory
/// is reachable or configured.
pub const GENESIS_NODES: &[&str] = &[
    "https://node1.gonka.network",
    "https://node2.gonka.network",
    "https://node3.gonka.network",
];

#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Return the currently known-live node URLs, most-preferred first.
    async fn list_nodes(&self) -> Vec<String>;
}

/// A directory that always returns the fixed genesis set. Used when no
/// external directory service is configured.
pub struct GenesisDirectory;

#[async_trait]
impl NodeDirectory for GenesisDirectory {
    async fn list_nodes(&self) -> Vec<String> {
        GENESIS_NODES.iter().map(|s| s.to_string()).collect()
    }
}

/// Pick the first node not already in `tried`, falling back to a random
/// pick from the whole list, or `None` if the list is empty.
pub fn pick_unused(available: &[String], tried: &std::collections::HashSet<String>) -> Option<String> {
    if let Some(fresh) = available.iter().find(|n| !tried.contains(*n)) {
        return Some(fresh.clone());
    }
    if available.is_empty() {
        return None;
    }
    use rand::seq::SliceRandom;
    available.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefers_an_unused_node() {
        let available = vec!["a".to_string(), "b".to_string()];
        let mut tried = HashSet::new();
        tried.insert("a".to_string());
        assert_eq!(pick_unused(&available, &tried), Some("b".to_string()));
    }

    #[test]
    fn falls_back_to_random_when_all_tried() {
        let available = vec!["a".to_string()];
        let mut tried = HashSet::new();
        tried.insert("a".to_string());
        assert_eq!(pick_unused(&available, &tried), Some("a".to_string()));
    }

    #[test]
    fn empty_directory_yields_none() {
        assert_eq!(pick_unused(&[], &HashSet::new()), None);
    }
}
