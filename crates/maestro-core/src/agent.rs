use crate::config::AgentConfig;
use crate::context::QueryContext;
use crate::error::{MaestroError, MaestroResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A tag describing a kind of task an agent can perform.
pub type Capability = String;

/// Trait every dispatchable agent implements.
///
/// An agent is opaque to the dispatch layer: it declares what it can do and
/// turns an input into an output. Any caching, quotas or model calls live
/// behind `process`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Static capability tags, readable without invoking the agent.
    fn capabilities(&self) -> &BTreeSet<Capability>;

    /// Priority weight the implementation prefers, if any.
    ///
    /// Informational only: routing never instantiates an agent to score it,
    /// so the router reads [`AgentDescriptor::priority_hint`] instead. Use
    /// [`AgentDescriptor::with_agent_priority`] to copy this value into a
    /// descriptor when the agent can be built ahead of registration.
    fn priority(&self) -> Option<i64> {
        None
    }

    /// Process one input. `context` is absent for workflow steps that run
    /// without an originating request.
    async fn process(
        &self,
        input: serde_json::Value,
        context: Option<&QueryContext>,
    ) -> MaestroResult<serde_json::Value>;
}

/// Factory producing an agent instance from its stored configuration.
///
/// Invoked at most once per successful construction of a registry entry.
#[async_trait]
pub trait AgentConstructor: Send + Sync {
    /// Build the agent registered as `agent_id` from its stored config.
    async fn construct(&self, agent_id: &str, config: &AgentConfig)
        -> MaestroResult<Arc<dyn Agent>>;
}

/// Adapts a synchronous closure into an [`AgentConstructor`].
pub struct FnConstructor<F, A> {
    build: F,
    _agent: PhantomData<fn() -> A>,
}

impl<F, A> FnConstructor<F, A>
where
    F: Fn(&str, &AgentConfig) -> MaestroResult<A> + Send + Sync,
    A: Agent + 'static,
{
    /// Wrap `build`.
    pub fn new(build: F) -> Self {
        Self {
            build,
            _agent: PhantomData,
        }
    }
}

#[async_trait]
impl<F, A> AgentConstructor for FnConstructor<F, A>
where
    F: Fn(&str, &AgentConfig) -> MaestroResult<A> + Send + Sync,
    A: Agent + 'static,
{
    async fn construct(
        &self,
        agent_id: &str,
        config: &AgentConfig,
    ) -> MaestroResult<Arc<dyn Agent>> {
        let agent = (self.build)(agent_id, config)?;
        Ok(Arc::new(agent))
    }
}

/// Immutable description of a registrable agent type.
#[derive(Clone)]
pub struct AgentDescriptor {
    /// Unique registry key.
    pub agent_id: String,
    /// Capability tags the agent declares. Never empty once registered.
    pub capabilities: BTreeSet<Capability>,
    /// Deterministic tie-break weight used by the router.
    pub priority_hint: Option<i64>,
    /// Factory run on first use.
    pub constructor: Arc<dyn AgentConstructor>,
}

impl AgentDescriptor {
    /// Descriptor with an explicit constructor and no priority hint.
    pub fn new<I, S>(
        agent_id: impl Into<String>,
        capabilities: I,
        constructor: Arc<dyn AgentConstructor>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Capability>,
    {
        Self {
            agent_id: agent_id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            priority_hint: None,
            constructor,
        }
    }

    /// Descriptor whose constructor is a plain closure.
    pub fn from_fn<I, S, F, A>(agent_id: impl Into<String>, capabilities: I, build: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Capability>,
        F: Fn(&str, &AgentConfig) -> MaestroResult<A> + Send + Sync + 'static,
        A: Agent + 'static,
    {
        Self::new(agent_id, capabilities, Arc::new(FnConstructor::new(build)))
    }

    /// Set the router tie-break weight.
    pub fn with_priority_hint(mut self, hint: i64) -> Self {
        self.priority_hint = Some(hint);
        self
    }

    /// Take the tie-break weight from an agent's own [`Agent::priority`].
    /// Leaves the hint untouched when the agent has no preference.
    pub fn with_agent_priority(mut self, agent: &dyn Agent) -> Self {
        if let Some(priority) = agent.priority() {
            self.priority_hint = Some(priority);
        }
        self
    }

    /// Whether the agent declares `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Check the descriptor's own invariants (non-empty id and capabilities).
    pub fn validate(&self) -> MaestroResult<()> {
        if self.agent_id.trim().is_empty() {
            return Err(MaestroError::Config("agent_id must not be empty".to_string()));
        }
        if self.capabilities.is_empty() {
            return Err(MaestroError::Config(format!(
                "agent '{}' must declare at least one capability",
                self.agent_id
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("agent_id", &self.agent_id)
            .field("capabilities", &self.capabilities)
            .field("priority_hint", &self.priority_hint)
            .finish_non_exhaustive()
    }
}

impl PartialEq for AgentDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.agent_id == other.agent_id
            && self.capabilities == other.capabilities
            && self.priority_hint == other.priority_hint
            && std::ptr::eq(
                Arc::as_ptr(&self.constructor).cast::<()>(),
                Arc::as_ptr(&other.constructor).cast::<()>(),
            )
    }
}
