use chrono::{DateTime, Utc};
use maestro_core::MaestroResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Whether a dispatch succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// The agent returned an output.
    Success,
    /// Construction or processing failed.
    Failure,
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::Success => write!(f, "success"),
            DispatchOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// Emitted after every agent invocation, query or workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    /// Agent that was invoked.
    pub agent_id: String,
    /// How the invocation ended.
    pub outcome: DispatchOutcome,
    /// Wall time of the invocation.
    pub duration_ms: u64,
    /// Workflow name, for workflow steps.
    #[serde(default)]
    pub workflow: Option<String>,
    /// Step index, for workflow steps.
    #[serde(default)]
    pub step: Option<usize>,
    /// When the event was created.
    pub at: DateTime<Utc>,
}

impl DispatchEvent {
    /// Event for a single-query dispatch, stamped now.
    pub fn new(agent_id: impl Into<String>, outcome: DispatchOutcome, duration_ms: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            outcome,
            duration_ms,
            workflow: None,
            step: None,
            at: Utc::now(),
        }
    }

    /// Tag the event with its workflow step.
    pub fn in_workflow(mut self, workflow: impl Into<String>, step: usize) -> Self {
        self.workflow = Some(workflow.into());
        self.step = Some(step);
        self
    }
}

/// Best-effort observability sink.
///
/// A failing sink never fails the dispatch that produced the event; the
/// orchestrator logs the error and moves on.
pub trait DispatchSink: Send + Sync {
    /// Publish one event.
    fn emit(&self, event: &DispatchEvent) -> MaestroResult<()>;
}

/// Sink that writes each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DispatchSink for TracingSink {
    fn emit(&self, event: &DispatchEvent) -> MaestroResult<()> {
        info!(
            agent_id = %event.agent_id,
            outcome = %event.outcome,
            duration_ms = event.duration_ms,
            workflow = ?event.workflow,
            step = ?event.step,
            "Agent dispatch"
        );
        Ok(())
    }
}

/// Counters tracked per agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Agent these counters belong to.
    pub agent_id: String,
    /// Successful invocations.
    pub successes: u64,
    /// Failed invocations, construction failures included.
    pub failures: u64,
    /// Sum of all invocation durations.
    pub total_duration_ms: u64,
    /// Duration of the most recent invocation.
    pub last_duration_ms: u64,
    /// Outcome of the most recent invocation.
    pub last_outcome: Option<DispatchOutcome>,
    /// Timestamp of the most recent invocation.
    pub last_seen: Option<DateTime<Utc>>,
}

impl AgentStats {
    /// Successes plus failures.
    pub fn invocations(&self) -> u64 {
        self.successes + self.failures
    }
}

/// Aggregate counters across all agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Number of distinct agents seen.
    pub agents: usize,
    /// Successes across all agents.
    pub successes: u64,
    /// Failures across all agents.
    pub failures: u64,
    /// Summed duration across all agents.
    pub total_duration_ms: u64,
}

/// In-memory per-agent dispatch metrics.
pub struct AgentMonitor {
    stats: RwLock<HashMap<String, AgentStats>>,
}

impl AgentMonitor {
    /// Monitor with no recorded agents.
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(HashMap::new()),
        }
    }

    /// Record one event.
    pub fn record(&self, event: &DispatchEvent) {
        let mut stats = self.stats.write();
        let entry = stats
            .entry(event.agent_id.clone())
            .or_insert_with(|| AgentStats {
                agent_id: event.agent_id.clone(),
                ..AgentStats::default()
            });
        match event.outcome {
            DispatchOutcome::Success => entry.successes += 1,
            DispatchOutcome::Failure => entry.failures += 1,
        }
        entry.total_duration_ms += event.duration_ms;
        entry.last_duration_ms = event.duration_ms;
        entry.last_outcome = Some(event.outcome);
        entry.last_seen = Some(event.at);
    }

    /// Stats for every agent seen so far, sorted by agent id.
    pub fn snapshot(&self) -> Vec<AgentStats> {
        let mut all: Vec<AgentStats> = self.stats.read().values().cloned().collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        all
    }

    /// Stats for one agent, if it has been seen.
    pub fn get_stats(&self, agent_id: &str) -> Option<AgentStats> {
        self.stats.read().get(agent_id).cloned()
    }

    /// Totals across all agents.
    pub fn aggregate(&self) -> AggregateStats {
        let stats = self.stats.read();
        let mut total = AggregateStats {
            agents: stats.len(),
            ..AggregateStats::default()
        };
        for s in stats.values() {
            total.successes += s.successes;
            total.failures += s.failures;
            total.total_duration_ms += s.total_duration_ms;
        }
        total
    }

    /// Serialize the current state as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "agents": self.snapshot(),
            "aggregate": self.aggregate(),
        })
    }
}

impl Default for AgentMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchSink for AgentMonitor {
    fn emit(&self, event: &DispatchEvent) -> MaestroResult<()> {
        self.record(event);
        Ok(())
    }
}
