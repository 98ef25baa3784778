//! Application state for the agentwire server.

use std::collections::BTreeMap;
use std::sync::Arc;

use agentwire_core::SharedAgent;

/// Agents addressable by name.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, SharedAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent` under `name`, returning the agent it replaced.
    pub fn insert(&mut self, name: impl Into<String>, agent: SharedAgent) -> Option<SharedAgent> {
        self.agents.insert(name.into(), agent)
    }

    pub fn get(&self, name: &str) -> Option<SharedAgent> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Registered agents, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedAgent)> {
        self.agents.iter().map(|(name, agent)| (name.as_str(), agent))
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.agents.keys()).finish()
    }
}

/// Shared application state.
///
/// Cloned for each request; the registry itself is shared read-only.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
}

impl AppState {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentwire_core::{EchoAgent, ScriptedChatAgent};

    #[test]
    fn test_registry_orders_by_name() {
        let mut registry = AgentRegistry::new();
        registry.insert("scripted", Arc::new(ScriptedChatAgent::new()) as SharedAgent);
        registry.insert("echo", Arc::new(EchoAgent::new()) as SharedAgent);

        let names: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["echo", "scripted"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = AgentRegistry::new();
        assert!(registry
            .insert("echo", Arc::new(EchoAgent::new()) as SharedAgent)
            .is_none());
        assert!(registry
            .insert("echo", Arc::new(EchoAgent::new().with_prefix("> ")) as SharedAgent)
            .is_some());
        assert_eq!(registry.len(), 1);
    }
}
