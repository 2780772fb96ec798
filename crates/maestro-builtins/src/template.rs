use async_trait::async_trait;
use maestro_core::{Agent, AgentConfig, Capability, MaestroError, MaestroResult, QueryContext};
use std::collections::BTreeSet;

/// Agent that renders its input into a fixed text template.
///
/// Recognised placeholders: `{input}`, `{user}`, `{session}`. String inputs
/// are inserted verbatim; any other JSON value is inserted serialized.
pub struct TemplateAgent {
    capabilities: BTreeSet<Capability>,
    template: String,
}

impl TemplateAgent {
    /// Agent rendering `template`.
    pub fn new<I, S>(capabilities: I, template: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Capability>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            template: template.into(),
        }
    }

    /// Build from config; `settings.template` is required.
    pub fn from_config(
        agent_id: &str,
        capabilities: BTreeSet<Capability>,
        config: &AgentConfig,
    ) -> MaestroResult<Self> {
        let template = config
            .setting_str("template")
            .ok_or_else(|| MaestroError::Construction {
                agent_id: agent_id.to_string(),
                reason: "missing 'template' setting".to_string(),
            })?;
        Ok(Self::new(capabilities, template))
    }

    fn render(&self, input: &serde_json::Value, context: Option<&QueryContext>) -> String {
        let input_text = match input {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let (user, session) = context
            .map(|c| (c.user_id.as_str(), c.session_id.as_str()))
            .unwrap_or(("", ""));
        let mut out = String::with_capacity(self.template.len() + input_text.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let substitution = [
                ("{input}", input_text.as_str()),
                ("{user}", user),
                ("{session}", session),
            ]
            .into_iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder));
            match substitution {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[async_trait]
impl Agent for TemplateAgent {
    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    async fn process(
        &self,
        input: serde_json::Value,
        context: Option<&QueryContext>,
    ) -> MaestroResult<serde_json::Value> {
        Ok(serde_json::Value::String(self.render(&input, context)))
    }
}
