use crate::registry::AgentRegistry;
use maestro_core::Capability;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Capability tag → ids of the agents declaring it, in registration order.
pub type CapabilityIndex = BTreeMap<Capability, Vec<String>>;

/// Read-only capability analysis over an [`AgentRegistry`].
///
/// The index is derived from the registry's descriptors and cached against
/// the registry generation, so it is rebuilt only after a `register`.
pub struct AgentDiscovery {
    registry: Arc<AgentRegistry>,
    cache: Mutex<Option<(u64, Arc<CapabilityIndex>)>>,
}

impl AgentDiscovery {
    /// Discovery over `registry`.
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            cache: Mutex::new(None),
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Build (or reuse) the capability index.
    pub fn discover_capabilities(&self) -> CapabilityIndex {
        self.index().as_ref().clone()
    }

    /// Ids of every agent covering *any* of `requirements`.
    ///
    /// This is a union, not an intersection: a caller that needs one agent
    /// covering all requirements must filter the result itself.
    pub fn analyze_requirements<I, S>(&self, requirements: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = self.index();
        let mut needed = BTreeSet::new();
        for requirement in requirements {
            if let Some(ids) = index.get(requirement.as_ref()) {
                needed.extend(ids.iter().cloned());
            }
        }
        needed
    }

    /// Agents declaring `capability`, in registration order.
    pub fn agents_with(&self, capability: &str) -> Vec<String> {
        self.index().get(capability).cloned().unwrap_or_default()
    }

    /// Every capability declared by at least one agent, sorted.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.index().keys().cloned().collect()
    }

    fn index(&self) -> Arc<CapabilityIndex> {
        let mut cache = self.cache.lock();
        let generation = self.registry.generation();
        if let Some((cached_generation, index)) = cache.as_ref() {
            if *cached_generation == generation {
                return index.clone();
            }
        }

        let (generation, descriptors) = self.registry.snapshot();
        let mut index = CapabilityIndex::new();
        for descriptor in &descriptors {
            for capability in &descriptor.capabilities {
                index
                    .entry(capability.clone())
                    .or_default()
                    .push(descriptor.agent_id.clone());
            }
        }
        debug!(
            generation,
            capabilities = index.len(),
            "Rebuilt capability index"
        );

        let index = Arc::new(index);
        *cache = Some((generation, index.clone()));
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maestro_core::{
        Agent, AgentConfig, AgentDescriptor, MaestroResult, QueryContext,
    };

    struct Noop {
        caps: BTreeSet<Capability>,
    }

    #[async_trait]
    impl Agent for Noop {
        fn capabilities(&self) -> &BTreeSet<Capability> {
            &self.caps
        }

        async fn process(
            &self,
            input: serde_json::Value,
            _context: Option<&QueryContext>,
        ) -> MaestroResult<serde_json::Value> {
            Ok(input)
        }
    }

    fn register(registry: &AgentRegistry, id: &str, caps: &[&str]) {
        let owned: BTreeSet<Capability> = caps.iter().map(|c| c.to_string()).collect();
        let descriptor = AgentDescriptor::from_fn(id, owned.clone(), move |_, _| {
            Ok(Noop { caps: owned.clone() })
        });
        registry.register(descriptor, AgentConfig::default()).unwrap();
    }

    fn setup() -> AgentDiscovery {
        let registry = Arc::new(AgentRegistry::new());
        register(&registry, "web_researcher", &["search", "summarize"]);
        register(&registry, "tech_stack", &["architecture", "summarize"]);
        register(&registry, "github", &["code", "search"]);
        AgentDiscovery::new(registry)
    }

    #[test]
    fn test_index_keeps_registration_order() {
        let discovery = setup();
        let index = discovery.discover_capabilities();
        assert_eq!(index["search"], vec!["web_researcher", "github"]);
        assert_eq!(index["summarize"], vec!["web_researcher", "tech_stack"]);
        assert_eq!(index["architecture"], vec!["tech_stack"]);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_union_semantics() {
        let discovery = setup();
        let needed = discovery.analyze_requirements(["architecture", "code"]);
        let expected: BTreeSet<String> = ["tech_stack", "github"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(needed, expected);
    }

    #[test]
    fn test_unknown_capability_is_empty() {
        let discovery = setup();
        assert!(discovery.analyze_requirements(["telepathy"]).is_empty());
        assert!(discovery.analyze_requirements(Vec::<String>::new()).is_empty());
        assert!(discovery.agents_with("telepathy").is_empty());
    }

    #[test]
    fn test_index_refreshes_after_register() {
        let discovery = setup();
        assert!(discovery.agents_with("translate").is_empty());

        register(discovery.registry(), "translator", &["translate"]);
        assert_eq!(discovery.agents_with("translate"), vec!["translator"]);
        assert!(discovery.capabilities().contains(&"translate".to_string()));
    }

    #[test]
    fn test_discover_returns_independent_copy() {
        let discovery = setup();
        let mut index = discovery.discover_capabilities();
        index.clear();
        assert_eq!(discovery.discover_capabilities().len(), 4);
    }
}
