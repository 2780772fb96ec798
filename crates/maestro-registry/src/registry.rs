use futures_util::future::{BoxFuture, FutureExt, Shared};
use maestro_core::{Agent, AgentConfig, AgentDescriptor, MaestroError, MaestroResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// An in-flight construction. Every waiter polls a clone of the same future,
/// so dropping one waiter never restarts the constructor.
type PendingBuild = Shared<BoxFuture<'static, Result<Arc<dyn Agent>, String>>>;

/// One registered agent: its descriptor, its config and the lazily-built
/// instance. `pending` is the per-id construction guard.
struct Entry {
    descriptor: AgentDescriptor,
    config: AgentConfig,
    instance: OnceLock<Arc<dyn Agent>>,
    pending: Mutex<Option<PendingBuild>>,
}

impl Entry {
    fn start_build(&self, agent_id: &str) -> PendingBuild {
        let constructor = self.descriptor.constructor.clone();
        let config = self.config.clone();
        let agent_id = agent_id.to_string();
        async move {
            info!(agent_id = %agent_id, "Constructing agent instance");
            constructor
                .construct(&agent_id, &config)
                .await
                .map_err(|e| match e {
                    MaestroError::Construction { reason, .. } => reason,
                    other => other.to_string(),
                })
        }
        .boxed()
        .shared()
    }
}

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Arc<Entry>>,
    /// Registration order.
    order: Vec<String>,
    /// Bumped on every successful `register`.
    generation: u64,
}

/// Central registry of agent types and their live instances.
///
/// Descriptors are stored at registration time; instances are created on the
/// first `get_agent` call for an id and reused for the life of the registry.
pub struct AgentRegistry {
    entries: RwLock<Entries>,
}

impl AgentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Register an agent type. Does not instantiate it.
    pub fn register(&self, descriptor: AgentDescriptor, config: AgentConfig) -> MaestroResult<()> {
        descriptor.validate()?;

        let mut entries = self.entries.write();
        if entries.by_id.contains_key(&descriptor.agent_id) {
            warn!(agent_id = %descriptor.agent_id, "Rejected duplicate agent registration");
            return Err(MaestroError::DuplicateAgent(descriptor.agent_id));
        }

        let agent_id = descriptor.agent_id.clone();
        info!(
            agent_id = %agent_id,
            capabilities = ?descriptor.capabilities,
            priority_hint = ?descriptor.priority_hint,
            "Registered agent"
        );
        entries.order.push(agent_id.clone());
        entries.by_id.insert(
            agent_id,
            Arc::new(Entry {
                descriptor,
                config,
                instance: OnceLock::new(),
                pending: Mutex::new(None),
            }),
        );
        entries.generation += 1;
        Ok(())
    }

    /// Fetch the live instance for `agent_id`, constructing it on first use.
    ///
    /// Returns `Ok(None)` for an id that was never registered. Concurrent
    /// first callers for the same id share a single constructor invocation;
    /// callers for other ids are not blocked by it. A caller that is dropped
    /// mid-construction (e.g. by a timeout) leaves the build in place for the
    /// next caller to join.
    pub async fn get_agent(&self, agent_id: &str) -> MaestroResult<Option<Arc<dyn Agent>>> {
        let entry = self.entries.read().by_id.get(agent_id).cloned();
        let Some(entry) = entry else {
            debug!(agent_id = %agent_id, "Lookup for unregistered agent");
            return Ok(None);
        };

        if let Some(agent) = entry.instance.get() {
            return Ok(Some(agent.clone()));
        }

        let build = {
            let mut pending = entry.pending.lock();
            if let Some(agent) = entry.instance.get() {
                return Ok(Some(agent.clone()));
            }
            pending
                .get_or_insert_with(|| entry.start_build(agent_id))
                .clone()
        };

        match build.clone().await {
            Ok(agent) => {
                let agent = entry.instance.get_or_init(|| agent).clone();
                entry.pending.lock().take();
                Ok(Some(agent))
            }
            Err(reason) => {
                // Clear only our own build so a later call may retry.
                let mut pending = entry.pending.lock();
                if pending.as_ref().is_some_and(|p| p.ptr_eq(&build)) {
                    *pending = None;
                }
                warn!(agent_id = %agent_id, reason = %reason, "Agent construction failed");
                Err(MaestroError::Construction {
                    agent_id: agent_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Like [`get_agent`](Self::get_agent) but treats an unknown id as an error.
    pub async fn resolve(&self, agent_id: &str) -> MaestroResult<Arc<dyn Agent>> {
        self.get_agent(agent_id)
            .await?
            .ok_or_else(|| MaestroError::AgentNotFound(agent_id.to_string()))
    }

    /// Copy of every registered descriptor keyed by id.
    pub fn list_agents(&self) -> HashMap<String, AgentDescriptor> {
        self.entries
            .read()
            .by_id
            .iter()
            .map(|(id, entry)| (id.clone(), entry.descriptor.clone()))
            .collect()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.snapshot().1
    }

    /// Generation and registration-ordered descriptors, read atomically.
    pub fn snapshot(&self) -> (u64, Vec<AgentDescriptor>) {
        let entries = self.entries.read();
        let descriptors = entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id))
            .map(|entry| entry.descriptor.clone())
            .collect();
        (entries.generation, descriptors)
    }

    /// Stored config for `agent_id`.
    pub fn config(&self, agent_id: &str) -> Option<AgentConfig> {
        self.entries
            .read()
            .by_id
            .get(agent_id)
            .map(|entry| entry.config.clone())
    }

    /// Whether `agent_id` is registered.
    pub fn contains(&self, agent_id: &str) -> bool {
        self.entries.read().by_id.contains_key(agent_id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.read().order.clone()
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Changes whenever the descriptor set changes.
    pub fn generation(&self) -> u64 {
        self.entries.read().generation
    }

    /// Number of agents that have been materialized so far.
    pub fn instantiated_count(&self) -> usize {
        self.entries
            .read()
            .by_id
            .values()
            .filter(|entry| entry.instance.get().is_some())
            .count()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maestro_core::{Capability, QueryContext};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Dummy {
        caps: BTreeSet<Capability>,
    }

    #[async_trait]
    impl Agent for Dummy {
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

    fn descriptor(id: &str, caps: &[&str]) -> AgentDescriptor {
        let owned: BTreeSet<Capability> = caps.iter().map(|c| c.to_string()).collect();
        AgentDescriptor::from_fn(id, owned.clone(), move |_, _| {
            Ok(Dummy { caps: owned.clone() })
        })
    }

    #[test]
    fn test_register_and_list() {
        let registry = AgentRegistry::new();
        registry
            .register(descriptor("a", &["x"]), AgentConfig::default())
            .unwrap();
        registry
            .register(descriptor("b", &["y"]), AgentConfig::default())
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.generation(), 2);
        assert!(registry.contains("a"));
        assert!(!registry.contains("c"));
        assert_eq!(registry.instantiated_count(), 0);
    }

    #[test]
    fn test_duplicate_rejected_and_first_kept() {
        let registry = AgentRegistry::new();
        let first = descriptor("a", &["x"]);
        registry.register(first.clone(), AgentConfig::default()).unwrap();

        let err = registry
            .register(descriptor("a", &["other"]), AgentConfig::default())
            .unwrap_err();
        assert!(matches!(err, MaestroError::DuplicateAgent(ref id) if id == "a"));

        let listed = registry.list_agents();
        assert_eq!(listed.get("a"), Some(&first));
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn test_invalid_descriptor_rejected() {
        let registry = AgentRegistry::new();
        let err = registry
            .register(descriptor("a", &[]), AgentConfig::default())
            .unwrap_err();
        assert!(matches!(err, MaestroError::Config(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let registry = AgentRegistry::new();
        assert!(registry.get_agent("nope").await.unwrap().is_none());
        assert!(matches!(
            registry.resolve("nope").await,
            Err(MaestroError::AgentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_instance_is_reused() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = AgentRegistry::new();
        registry
            .register(
                AgentDescriptor::from_fn("a", ["x"], move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Dummy {
                        caps: ["x".to_string()].into(),
                    })
                }),
                AgentConfig::default(),
            )
            .unwrap();

        let first = registry.get_agent("a").await.unwrap().unwrap();
        let second = registry.get_agent("a").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.instantiated_count(), 1);
    }

    #[tokio::test]
    async fn test_constructor_failure_leaves_cell_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = AgentRegistry::new();
        registry
            .register(
                AgentDescriptor::from_fn("flaky", ["x"], move |_, _| {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(MaestroError::Agent("cold start".to_string()));
                    }
                    Ok(Dummy {
                        caps: ["x".to_string()].into(),
                    })
                }),
                AgentConfig::default(),
            )
            .unwrap();

        let err = match registry.get_agent("flaky").await {
            Err(e) => e,
            Ok(_) => panic!("first construction should fail"),
        };
        assert!(matches!(err, MaestroError::Construction { ref agent_id, .. } if agent_id == "flaky"));
        assert_eq!(registry.instantiated_count(), 0);

        assert!(registry.get_agent("flaky").await.unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_list_agents_is_a_copy() {
        let registry = AgentRegistry::new();
        registry
            .register(descriptor("a", &["x"]), AgentConfig::default())
            .unwrap();
        registry
            .register(descriptor("b", &["y", "z"]), AgentConfig::default())
            .unwrap();

        assert_eq!(registry.list_agents(), registry.list_agents());

        let mut listed = registry.list_agents();
        listed.clear();
        listed.insert("ghost".to_string(), descriptor("ghost", &["y"]));

        let again = registry.list_agents();
        assert_eq!(again.len(), 2);
        assert!(again.contains_key("a"));
        assert_eq!(again, registry.list_agents());
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn test_config_is_stored() {
        let registry = AgentRegistry::new();
        let config = AgentConfig::with_settings(serde_json::json!({"k": "v"}));
        registry.register(descriptor("a", &["x"]), config.clone()).unwrap();
        assert_eq!(registry.config("a"), Some(config));
        assert_eq!(registry.config("b"), None);
    }
}
