use maestro_builtins::{builtin_descriptor, BuiltinKind};
use maestro_core::{AgentConfig, MaestroResult};
use maestro_orchestrator::{AgentOrchestrator, KeywordClassifier, RouterConfig, TracingSink};
use maestro_registry::AgentRegistry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Contents of `maestro.toml`.
#[derive(Debug, Deserialize)]
pub struct MaestroConfig {
    pub router: RouterConfig,
    #[serde(default)]
    pub classifier: KeywordClassifier,
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
    /// Workflow name → ordered agent ids.
    #[serde(default)]
    pub workflows: BTreeMap<String, Vec<String>>,
}

/// One `[[agents]]` table.
#[derive(Debug, Deserialize)]
pub struct AgentEntry {
    pub id: String,
    pub kind: BuiltinKind,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub priority_hint: Option<i64>,
    #[serde(default)]
    pub config: AgentConfig,
}

impl MaestroConfig {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        Self::parse(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Replay agent and workflow registrations, then validate the router.
    pub fn build(&self) -> MaestroResult<AgentOrchestrator> {
        let registry = Arc::new(AgentRegistry::new());
        for agent in &self.agents {
            registry.register(
                builtin_descriptor(
                    agent.id.clone(),
                    agent.kind,
                    agent.capabilities.iter().cloned(),
                    agent.priority_hint,
                ),
                agent.config.clone(),
            )?;
        }

        let orchestrator = AgentOrchestrator::new(
            registry,
            self.router.clone(),
            Arc::new(self.classifier.clone()),
        )
        .with_sink(Arc::new(TracingSink));

        for (name, sequence) in &self.workflows {
            orchestrator.register_workflow(name.clone(), sequence.iter().cloned());
        }

        orchestrator.validate()?;
        info!(
            agents = self.agents.len(),
            workflows = self.workflows.len(),
            "Configuration loaded"
        );
        Ok(orchestrator)
    }
}
