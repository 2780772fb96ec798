use maestro_core::{MaestroError, MaestroResult};
use serde::{Deserialize, Serialize};

/// Execution state of a workflow run.
///
/// `Pending → Running(i) → {Running(i+1) | Failed | Completed}`. `Failed`
/// and `Completed` are terminal. An empty workflow goes straight from
/// `Pending` to `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Not started.
    Pending,
    /// Executing a step.
    Running {
        /// Zero-based index of the step in progress.
        step: usize,
    },
    /// Every step succeeded.
    Completed,
    /// A step failed to resolve or process.
    Failed {
        /// Index of the failing step.
        step: usize,
        /// Agent assigned to the failing step.
        agent_id: String,
    },
}

impl WorkflowStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed { .. })
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &WorkflowStatus) -> bool {
        match (self, next) {
            (WorkflowStatus::Pending, WorkflowStatus::Running { step: 0 }) => true,
            (WorkflowStatus::Pending, WorkflowStatus::Completed) => true,
            (WorkflowStatus::Running { step }, WorkflowStatus::Running { step: next }) => {
                *next == step + 1
            }
            (WorkflowStatus::Running { step }, WorkflowStatus::Failed { step: failed, .. }) => {
                failed == step
            }
            (WorkflowStatus::Running { .. }, WorkflowStatus::Completed) => true,
            _ => false,
        }
    }
}

/// Outcome of a single workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Zero-based step index.
    pub step: usize,
    /// Agent assigned to the step.
    pub agent_id: String,
    /// Wall time including construction.
    pub duration_ms: u64,
    /// Whether the step produced an output.
    pub succeeded: bool,
}

/// The full record of one `run_workflow` call.
#[derive(Debug)]
pub struct WorkflowRun {
    /// Workflow name.
    pub workflow: String,
    /// Final state.
    pub status: WorkflowStatus,
    /// One record per attempted step.
    pub steps: Vec<StepRecord>,
    /// Final output, set on `Completed`.
    pub output: Option<serde_json::Value>,
    /// The step failure, set on `Failed`.
    pub error: Option<MaestroError>,
}

impl WorkflowRun {
    pub(crate) fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            status: WorkflowStatus::Pending,
            steps: Vec::new(),
            output: None,
            error: None,
        }
    }

    pub(crate) fn transition(&mut self, next: WorkflowStatus) {
        debug_assert!(
            self.status.can_transition_to(&next),
            "illegal workflow transition {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }

    pub(crate) fn complete(&mut self, output: serde_json::Value) {
        self.transition(WorkflowStatus::Completed);
        self.output = Some(output);
    }

    pub(crate) fn fail(&mut self, step: usize, agent_id: &str, error: MaestroError) {
        self.transition(WorkflowStatus::Failed {
            step,
            agent_id: agent_id.to_string(),
        });
        self.error = Some(error);
    }

    /// Whether the run reached `Completed`.
    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    /// Collapse the run into the final output or the step failure.
    pub fn into_result(self) -> MaestroResult<serde_json::Value> {
        match (self.output, self.error) {
            (_, Some(error)) => Err(error),
            (Some(output), None) => Ok(output),
            (None, None) => Err(MaestroError::Agent(format!(
                "workflow '{}' did not finish (status {:?})",
                self.workflow, self.status
            ))),
        }
    }

    /// JSON summary for logging and CLI output.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "workflow": self.workflow,
            "status": self.status,
            "steps": self.steps,
            "output": self.output,
            "error": self.error.as_ref().map(ToString::to_string),
        })
    }
}
