use crate::agent::Capability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-request routing context. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Caller identity.
    pub user_id: String,
    /// Conversation or request-group id.
    pub session_id: String,
    /// Optional caller-supplied classifier for the query.
    #[serde(default)]
    pub query_type: Option<String>,
    /// Request priority. Defaults to 1.
    #[serde(default = "default_priority")]
    pub priority: i64,
    /// Capabilities the request insists on. Empty means "no restriction".
    #[serde(default)]
    pub required_capabilities: BTreeSet<Capability>,
}

fn default_priority() -> i64 {
    1
}

impl QueryContext {
    /// Context with default priority and no query type.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            query_type: None,
            priority: default_priority(),
            required_capabilities: BTreeSet::new(),
        }
    }

    /// Set the query type.
    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = Some(query_type.into());
        self
    }

    /// Set the request priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Add required capabilities.
    pub fn requiring<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Capability>,
    {
        self.required_capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = QueryContext::new("u1", "s1");
        assert_eq!(ctx.priority, 1);
        assert!(ctx.query_type.is_none());
        assert!(ctx.required_capabilities.is_empty());
    }

    #[test]
    fn test_deserialize_minimal() {
        let ctx: QueryContext =
            serde_json::from_str(r#"{"user_id": "u", "session_id": "s"}"#).unwrap();
        assert_eq!(ctx, QueryContext::new("u", "s"));
    }

    #[test]
    fn test_builders() {
        let ctx = QueryContext::new("u", "s")
            .with_query_type("research")
            .with_priority(5)
            .requiring(["web_search", "summarize"]);
        assert_eq!(ctx.query_type.as_deref(), Some("research"));
        assert_eq!(ctx.priority, 5);
        assert_eq!(ctx.required_capabilities.len(), 2);
    }
}
