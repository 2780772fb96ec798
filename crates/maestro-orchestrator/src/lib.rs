//! Query routing and multi-agent workflow orchestration.
//!
//! Scores registered agents for an incoming query, dispatches to the winner,
//! and runs named workflows in which each agent's output feeds the next
//! agent's input.
//!
//! # Main types
//!
//! - [`AgentOrchestrator`] — Façade over routing, the registry and workflows.
//! - [`QueryRouter`] — Deterministic capability scoring with fallback.
//! - [`QueryClassifier`] — Pluggable relevance strategy used by the router.
//! - [`WorkflowRun`] — Record of a workflow execution and its final state.
//! - [`AgentMonitor`] — Per-agent dispatch metrics.

/// Query relevance strategies.
pub mod classifier;
/// Orchestrator façade and workflow engine.
pub mod engine;
/// Dispatch events, sinks and per-agent metrics.
pub mod monitor;
/// Agent scoring and selection.
pub mod router;
/// Workflow state machine and run records.
pub mod workflow;

pub use classifier::{FixedClassifier, KeywordClassifier, QueryClassifier};
pub use engine::{AgentOrchestrator, Dispatch};
pub use monitor::{
    AgentMonitor, AgentStats, AggregateStats, DispatchEvent, DispatchOutcome, DispatchSink,
    TracingSink,
};
pub use router::{AgentScore, QueryRouter, RouterConfig};
pub use workflow::{StepRecord, WorkflowRun, WorkflowStatus};
