//! Built-in agents for Maestro.
//!
//! Small deterministic agents that need no external services. The `maestro`
//! binary registers them from configuration by [`BuiltinKind`], and tests
//! use them as stand-ins for real model-backed agents.
//!
//! # Main entry points
//!
//! - [`builtin_descriptor()`] — Build a registrable descriptor for a builtin kind.
//! - [`EchoAgent`], [`TemplateAgent`], [`ExtractAgent`] — The agents themselves.

/// Pass-through agent.
pub mod echo;
/// JSON pointer extraction agent.
pub mod extract;
/// Text template agent.
pub mod template;

pub use echo::EchoAgent;
pub use extract::ExtractAgent;
pub use template::TemplateAgent;

use maestro_core::{
    Agent, AgentConfig, AgentConstructor, AgentDescriptor, Capability, MaestroResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The builtin agent implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinKind {
    /// [`EchoAgent`].
    Echo,
    /// [`TemplateAgent`]; needs `settings.template`.
    Template,
    /// [`ExtractAgent`]; needs `settings.pointer`.
    Extract,
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltinKind::Echo => write!(f, "echo"),
            BuiltinKind::Template => write!(f, "template"),
            BuiltinKind::Extract => write!(f, "extract"),
        }
    }
}

/// Constructor for a builtin kind. Capabilities are fixed at registration.
struct BuiltinConstructor {
    kind: BuiltinKind,
    capabilities: BTreeSet<Capability>,
}

#[async_trait::async_trait]
impl AgentConstructor for BuiltinConstructor {
    async fn construct(
        &self,
        agent_id: &str,
        config: &AgentConfig,
    ) -> MaestroResult<Arc<dyn Agent>> {
        debug!(agent_id = %agent_id, kind = %self.kind, "Building builtin agent");
        let caps = self.capabilities.clone();
        let agent: Arc<dyn Agent> = match self.kind {
            BuiltinKind::Echo => Arc::new(EchoAgent::new(caps)),
            BuiltinKind::Template => Arc::new(TemplateAgent::from_config(agent_id, caps, config)?),
            BuiltinKind::Extract => Arc::new(ExtractAgent::from_config(agent_id, caps, config)?),
        };
        Ok(agent)
    }
}

/// Descriptor for a builtin agent of the given kind.
pub fn builtin_descriptor<I, S>(
    agent_id: impl Into<String>,
    kind: BuiltinKind,
    capabilities: I,
    priority_hint: Option<i64>,
) -> AgentDescriptor
where
    I: IntoIterator<Item = S>,
    S: Into<Capability>,
{
    let capabilities: BTreeSet<Capability> = capabilities.into_iter().map(Into::into).collect();
    let constructor = Arc::new(BuiltinConstructor {
        kind,
        capabilities: capabilities.clone(),
    });
    let descriptor = AgentDescriptor::new(agent_id, capabilities, constructor);
    match priority_hint {
        Some(hint) => descriptor.with_priority_hint(hint),
        None => descriptor,
    }
}
