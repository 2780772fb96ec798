use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A convenience `Result` alias using [`MaestroError`].
pub type MaestroResult<T> = Result<T, MaestroError>;

/// Top-level error type for the Maestro dispatch layer.
///
/// Each variant maps onto one [`ErrorKind`], which is what callers should
/// branch on when translating a failure into a user-visible response.
#[derive(Error, Debug)]
pub enum MaestroError {
    /// An agent id was registered twice.
    #[error("Agent '{0}' already registered")]
    DuplicateAgent(String),

    /// Invalid registration or router configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// An agent id did not resolve through the registry.
    #[error("Agent '{0}' not found")]
    AgentNotFound(String),

    /// No workflow is registered under the given name.
    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    /// The constructor of an agent failed on first use.
    #[error("Failed to construct agent '{agent_id}': {reason}")]
    Construction {
        /// Id of the agent whose constructor failed.
        agent_id: String,
        /// Constructor-supplied failure description.
        reason: String,
    },

    /// An agent's `process` operation failed. Wraps the agent's own error.
    #[error("{}", processing_message(agent_id, *step, source))]
    Processing {
        /// Id of the agent that was invoked.
        agent_id: String,
        /// Zero-based workflow step index, `None` for single-query dispatch.
        step: Option<usize>,
        /// The error raised by the agent, untouched.
        #[source]
        source: Box<MaestroError>,
    },

    /// Routing fell through to a `default_agent` that is not registered.
    #[error("Routing exhausted: default agent '{0}' is not registered")]
    RoutingExhausted(String),

    /// A failure raised from inside an agent implementation.
    #[error("Agent error: {0}")]
    Agent(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn processing_message(agent_id: &str, step: Option<usize>, source: &MaestroError) -> String {
    match step {
        Some(step) => format!("Agent '{agent_id}' failed at workflow step {step}: {source}"),
        None => format!("Agent '{agent_id}' failed: {source}"),
    }
}

/// Coarse classification of a [`MaestroError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Fatal, startup-time misconfiguration.
    Configuration,
    /// An expected lookup miss.
    NotFound,
    /// A per-request agent failure.
    AgentProcessing,
    /// The router had nowhere left to go.
    RoutingExhaustion,
    /// Anything else (I/O, serialization).
    Other,
}

impl MaestroError {
    /// Wrap an agent failure with the id of the agent that raised it.
    pub fn processing(agent_id: impl Into<String>, step: Option<usize>, source: MaestroError) -> Self {
        MaestroError::Processing {
            agent_id: agent_id.into(),
            step,
            source: Box::new(source),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MaestroError::DuplicateAgent(_)
            | MaestroError::Config(_)
            | MaestroError::Construction { .. } => ErrorKind::Configuration,
            MaestroError::AgentNotFound(_) | MaestroError::WorkflowNotFound(_) => {
                ErrorKind::NotFound
            }
            MaestroError::Processing { source, .. } => match source.kind() {
                kind @ (ErrorKind::NotFound | ErrorKind::Configuration) => kind,
                _ => ErrorKind::AgentProcessing,
            },
            MaestroError::Agent(_) => ErrorKind::AgentProcessing,
            MaestroError::RoutingExhausted(_) => ErrorKind::RoutingExhaustion,
            MaestroError::Json(_) | MaestroError::Io(_) => ErrorKind::Other,
        }
    }

    /// The agent id attached to this error, if any.
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            MaestroError::Processing { agent_id, .. }
            | MaestroError::Construction { agent_id, .. } => Some(agent_id),
            MaestroError::DuplicateAgent(id) | MaestroError::AgentNotFound(id) => Some(id),
            _ => None,
        }
    }

    /// The workflow step index attached to this error, if any.
    pub fn step(&self) -> Option<usize> {
        match self {
            MaestroError::Processing { step, .. } => *step,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_display_includes_step() {
        let err = MaestroError::processing("B", Some(1), MaestroError::Agent("boom".into()));
        assert_eq!(
            err.to_string(),
            "Agent 'B' failed at workflow step 1: Agent error: boom"
        );
        assert_eq!(err.agent_id(), Some("B"));
        assert_eq!(err.step(), Some(1));
    }

    #[test]
    fn test_processing_display_without_step() {
        let err = MaestroError::processing("web", None, MaestroError::Agent("timeout".into()));
        assert_eq!(err.to_string(), "Agent 'web' failed: Agent error: timeout");
        assert_eq!(err.step(), None);
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;
        let err = MaestroError::processing("a", None, MaestroError::Agent("inner".into()));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Agent error: inner"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            MaestroError::DuplicateAgent("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            MaestroError::WorkflowNotFound("w".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MaestroError::RoutingExhausted("d".into()).kind(),
            ErrorKind::RoutingExhaustion
        );
        assert_eq!(
            MaestroError::processing("a", None, MaestroError::Agent("e".into())).kind(),
            ErrorKind::AgentProcessing
        );
        assert_eq!(
            MaestroError::processing("a", Some(0), MaestroError::AgentNotFound("a".into())).kind(),
            ErrorKind::NotFound
        );
    }
}
