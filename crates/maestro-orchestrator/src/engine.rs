use crate::classifier::QueryClassifier;
use crate::monitor::{AgentMonitor, DispatchEvent, DispatchOutcome, DispatchSink};
use crate::router::{QueryRouter, RouterConfig};
use crate::workflow::{StepRecord, WorkflowRun, WorkflowStatus};
use maestro_core::{MaestroError, MaestroResult, QueryContext};
use maestro_registry::{AgentDiscovery, AgentRegistry};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of a single-query dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    /// Agent that handled the query.
    pub agent_id: String,
    /// The agent's output, unchanged.
    pub output: serde_json::Value,
    /// Wall time including first-use construction.
    pub duration_ms: u64,
}

/// Top-level façade: routes queries to agents and runs named workflows.
pub struct AgentOrchestrator {
    registry: Arc<AgentRegistry>,
    router: QueryRouter,
    workflows: RwLock<HashMap<String, Vec<String>>>,
    monitor: Arc<AgentMonitor>,
    sinks: Vec<Arc<dyn DispatchSink>>,
}

impl AgentOrchestrator {
    /// Build an orchestrator over `registry`. Discovery and routing share
    /// the same registry.
    pub fn new(
        registry: Arc<AgentRegistry>,
        config: RouterConfig,
        classifier: Arc<dyn QueryClassifier>,
    ) -> Self {
        let discovery = Arc::new(AgentDiscovery::new(registry.clone()));
        Self {
            router: QueryRouter::new(config, discovery, classifier),
            registry,
            workflows: RwLock::new(HashMap::new()),
            monitor: Arc::new(AgentMonitor::new()),
            sinks: Vec::new(),
        }
    }

    /// Add an observability sink. The built-in monitor is always fed.
    pub fn with_sink(mut self, sink: Arc<dyn DispatchSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Discovery over the shared registry.
    pub fn discovery(&self) -> &Arc<AgentDiscovery> {
        self.router.discovery()
    }

    /// The query router.
    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    /// Built-in per-agent metrics.
    pub fn monitor(&self) -> &Arc<AgentMonitor> {
        &self.monitor
    }

    /// Startup validation of the routing configuration.
    pub fn validate(&self) -> MaestroResult<()> {
        self.router.validate()
    }

    /// Route a query and return the chosen agent's output unchanged.
    pub async fn route_query(
        &self,
        query: &str,
        context: &QueryContext,
    ) -> MaestroResult<serde_json::Value> {
        self.dispatch(query, context).await.map(|d| d.output)
    }

    /// Route a query, run the chosen agent and report which agent ran.
    pub async fn dispatch(&self, query: &str, context: &QueryContext) -> MaestroResult<Dispatch> {
        let agent_id = self.router.route_query(query, context)?;

        info!(
            agent_id = %agent_id,
            user_id = %context.user_id,
            session_id = %context.session_id,
            "Dispatching query"
        );

        let start = Instant::now();
        let agent = match self.registry.resolve(&agent_id).await {
            Ok(agent) => agent,
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "Agent could not be resolved");
                self.emit(DispatchEvent::new(
                    &agent_id,
                    DispatchOutcome::Failure,
                    start.elapsed().as_millis() as u64,
                ));
                return Err(e);
            }
        };
        let result = agent
            .process(serde_json::Value::String(query.to_string()), Some(context))
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                self.emit(DispatchEvent::new(
                    &agent_id,
                    DispatchOutcome::Success,
                    duration_ms,
                ));
                Ok(Dispatch {
                    agent_id,
                    output,
                    duration_ms,
                })
            }
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "Agent failed to process query");
                self.emit(DispatchEvent::new(
                    &agent_id,
                    DispatchOutcome::Failure,
                    duration_ms,
                ));
                Err(MaestroError::processing(agent_id, None, e))
            }
        }
    }

    /// Store a named pipeline. Replaces any workflow with the same name.
    /// Agent ids are checked at execution time, not here.
    pub fn register_workflow<I, S>(&self, name: impl Into<String>, agent_sequence: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let sequence: Vec<String> = agent_sequence.into_iter().map(Into::into).collect();
        info!(workflow = %name, steps = ?sequence, "Registered workflow");
        if self.workflows.write().insert(name.clone(), sequence).is_some() {
            debug!(workflow = %name, "Replaced existing workflow");
        }
    }

    /// The agent sequence of a workflow.
    pub fn workflow(&self, name: &str) -> Option<Vec<String>> {
        self.workflows.read().get(name).cloned()
    }

    /// Registered workflow names, sorted.
    pub fn workflows(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run a workflow and return its final output or the first step failure.
    pub async fn execute_workflow(
        &self,
        workflow_name: &str,
        input_data: serde_json::Value,
    ) -> MaestroResult<serde_json::Value> {
        self.run_workflow(workflow_name, input_data, None)
            .await?
            .into_result()
    }

    /// Run a workflow step by step, feeding each output into the next step.
    ///
    /// Only an unknown workflow name is returned as `Err`; a step failure
    /// ends the run in [`WorkflowStatus::Failed`] and no later step runs.
    pub async fn run_workflow(
        &self,
        workflow_name: &str,
        input_data: serde_json::Value,
        context: Option<&QueryContext>,
    ) -> MaestroResult<WorkflowRun> {
        let sequence = self
            .workflow(workflow_name)
            .ok_or_else(|| MaestroError::WorkflowNotFound(workflow_name.to_string()))?;

        let mut run = WorkflowRun::new(workflow_name);
        info!(workflow = %workflow_name, steps = sequence.len(), "Starting workflow");

        let mut current = input_data;
        for (step, agent_id) in sequence.iter().enumerate() {
            run.transition(WorkflowStatus::Running { step });
            debug!(workflow = %workflow_name, step, agent_id = %agent_id, "Running workflow step");

            let start = Instant::now();
            let agent = match self.registry.resolve(agent_id).await {
                Ok(agent) => agent,
                Err(e) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    run.steps.push(StepRecord {
                        step,
                        agent_id: agent_id.clone(),
                        duration_ms,
                        succeeded: false,
                    });
                    self.emit(
                        DispatchEvent::new(agent_id, DispatchOutcome::Failure, duration_ms)
                            .in_workflow(workflow_name, step),
                    );
                    warn!(
                        workflow = %workflow_name,
                        step,
                        agent_id = %agent_id,
                        error = %e,
                        "Workflow step did not resolve"
                    );
                    run.fail(step, agent_id, MaestroError::processing(agent_id, Some(step), e));
                    return Ok(run);
                }
            };

            let result = agent.process(current, context).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let outcome = if result.is_ok() {
                DispatchOutcome::Success
            } else {
                DispatchOutcome::Failure
            };
            run.steps.push(StepRecord {
                step,
                agent_id: agent_id.clone(),
                duration_ms,
                succeeded: result.is_ok(),
            });
            self.emit(
                DispatchEvent::new(agent_id, outcome, duration_ms).in_workflow(workflow_name, step),
            );

            match result {
                Ok(output) => current = output,
                Err(e) => {
                    error!(
                        workflow = %workflow_name,
                        step,
                        agent_id = %agent_id,
                        error = %e,
                        "Workflow step failed"
                    );
                    run.fail(step, agent_id, MaestroError::processing(agent_id, Some(step), e));
                    return Ok(run);
                }
            }
        }

        info!(workflow = %workflow_name, "Workflow completed");
        run.complete(current);
        Ok(run)
    }

    fn emit(&self, event: DispatchEvent) {
        self.monitor.record(&event);
        for sink in &self.sinks {
            if let Err(e) = sink.emit(&event) {
                warn!(agent_id = %event.agent_id, error = %e, "Dispatch sink failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FixedClassifier;
    use maestro_builtins::{builtin_descriptor, BuiltinKind};
    use maestro_core::AgentConfig;

    fn orchestrator() -> AgentOrchestrator {
        let registry = Arc::new(AgentRegistry::new());
        registry
            .register(
                builtin_descriptor("general", BuiltinKind::Echo, ["chat"], None),
                AgentConfig::default(),
            )
            .unwrap();
        registry
            .register(
                builtin_descriptor("shout", BuiltinKind::Template, ["loud"], None),
                AgentConfig::with_settings(serde_json::json!({"template": "{input}!"})),
            )
            .unwrap();
        AgentOrchestrator::new(
            registry,
            RouterConfig::new("general"),
            Arc::new(FixedClassifier::new(["loud"])),
        )
    }

    #[tokio::test]
    async fn test_dispatch_reports_agent() {
        let orch = orchestrator();
        let ctx = QueryContext::new("u", "s");
        let dispatch = orch.dispatch("hey", &ctx).await.unwrap();
        assert_eq!(dispatch.agent_id, "shout");
        assert_eq!(dispatch.output, serde_json::json!("hey!"));
        assert_eq!(orch.monitor().get_stats("shout").unwrap().successes, 1);
    }

    #[tokio::test]
    async fn test_register_workflow_last_write_wins() {
        let orch = orchestrator();
        orch.register_workflow("w", ["general"]);
        orch.register_workflow("w", ["shout", "shout"]);
        assert_eq!(orch.workflow("w").unwrap(), vec!["shout", "shout"]);
        assert_eq!(orch.workflows(), vec!["w"]);

        let out = orch.execute_workflow("w", serde_json::json!("a")).await.unwrap();
        assert_eq!(out, serde_json::json!("a!!"));
    }

    #[tokio::test]
    async fn test_empty_workflow_returns_input() {
        let orch = orchestrator();
        orch.register_workflow("noop", Vec::<String>::new());
        let run = orch
            .run_workflow("noop", serde_json::json!({"x": 1}), None)
            .await
            .unwrap();
        assert_eq!(run.status, WorkflowStatus::Completed);
        assert_eq!(run.into_result().unwrap(), serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_unknown_workflow() {
        let orch = orchestrator();
        let err = orch
            .execute_workflow("missing", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, MaestroError::WorkflowNotFound(ref n) if n == "missing"));
    }

    #[tokio::test]
    async fn test_validate_delegates_to_router() {
        let orch = orchestrator();
        assert!(orch.validate().is_ok());
    }
}
