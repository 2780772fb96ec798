use async_trait::async_trait;
use maestro_core::{Agent, Capability, MaestroResult, QueryContext};
use std::collections::BTreeSet;

/// Agent that returns its input unchanged.
pub struct EchoAgent {
    capabilities: BTreeSet<Capability>,
}

impl EchoAgent {
    /// Echo agent declaring `capabilities`.
    pub fn new<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Capability>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    async fn process(
        &self,
        input: serde_json::Value,
        _context: Option<&QueryContext>,
    ) -> MaestroResult<serde_json::Value> {
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_input() {
        let agent = EchoAgent::new(["chat"]);
        assert!(agent.capabilities().contains("chat"));
        let input = serde_json::json!({"a": [1, 2, 3]});
        let out = agent.process(input.clone(), None).await.unwrap();
        assert_eq!(out, input);
    }
}
