use async_trait::async_trait;
use maestro_core::{Agent, AgentConfig, Capability, MaestroError, MaestroResult, QueryContext};
use std::collections::BTreeSet;

/// Agent that pulls one value out of a JSON document by JSON pointer.
///
/// A string input is parsed as JSON first. A missing pointer target is a
/// processing failure, which makes this agent handy for exercising
/// workflow short-circuiting.
pub struct ExtractAgent {
    capabilities: BTreeSet<Capability>,
    pointer: String,
}

impl ExtractAgent {
    /// Extractor for the JSON pointer `pointer`.
    pub fn new<I, S>(capabilities: I, pointer: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Capability>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            pointer: pointer.into(),
        }
    }

    /// Build from config; `settings.pointer` is required and must start with `/`.
    pub fn from_config(
        agent_id: &str,
        capabilities: BTreeSet<Capability>,
        config: &AgentConfig,
    ) -> MaestroResult<Self> {
        let pointer = config.setting_str("pointer").unwrap_or_default();
        if !pointer.starts_with('/') {
            return Err(MaestroError::Construction {
                agent_id: agent_id.to_string(),
                reason: format!("'pointer' setting must be a JSON pointer, got '{pointer}'"),
            });
        }
        Ok(Self::new(capabilities, pointer))
    }
}

#[async_trait]
impl Agent for ExtractAgent {
    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    async fn process(
        &self,
        input: serde_json::Value,
        _context: Option<&QueryContext>,
    ) -> MaestroResult<serde_json::Value> {
        let document = match input {
            serde_json::Value::String(text) => serde_json::from_str(&text)?,
            other => other,
        };
        document
            .pointer(&self.pointer)
            .cloned()
            .ok_or_else(|| MaestroError::Agent(format!("no value at '{}'", self.pointer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_from_object() {
        let agent = ExtractAgent::new(["extract"], "/result/summary");
        let out = agent
            .process(serde_json::json!({"result": {"summary": "ok"}}), None)
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!("ok"));
    }

    #[tokio::test]
    async fn test_extract_from_json_string() {
        let agent = ExtractAgent::new(["extract"], "/items/1");
        let out = agent
            .process(serde_json::json!("{\"items\": [10, 20]}"), None)
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!(20));
    }

    #[tokio::test]
    async fn test_missing_value_fails() {
        let agent = ExtractAgent::new(["extract"], "/nope");
        let err = agent
            .process(serde_json::json!({"a": 1}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MaestroError::Agent(_)));
    }

    #[tokio::test]
    async fn test_unparseable_string_fails() {
        let agent = ExtractAgent::new(["extract"], "/a");
        let err = agent
            .process(serde_json::json!("not json"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MaestroError::Json(_)));
    }

    #[test]
    fn test_from_config_validates_pointer() {
        let caps: BTreeSet<Capability> = ["extract".to_string()].into();
        let bad = AgentConfig::with_settings(serde_json::json!({"pointer": "summary"}));
        assert!(ExtractAgent::from_config("x", caps.clone(), &bad).is_err());
        let good = AgentConfig::with_settings(serde_json::json!({"pointer": "/summary"}));
        assert!(ExtractAgent::from_config("x", caps, &good).is_ok());
    }
}
