use serde::{Deserialize, Serialize};

/// Configuration handed to an agent's constructor on first use.
///
/// The registry owns this value and never mutates it after registration.
/// Only the constructor interprets it; the dispatch layer treats every field
/// as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent implementation version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Retry budget for agents that retry internally.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-call deadline the agent should honour.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Lifetime of any cache the agent keeps.
    #[serde(default = "default_memory_ttl_secs")]
    pub memory_ttl_secs: u64,
    /// Agent-specific settings (templates, endpoints, field names...).
    #[serde(default)]
    pub settings: serde_json::Value,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_memory_ttl_secs() -> u64 {
    3600
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            memory_ttl_secs: default_memory_ttl_secs(),
            settings: serde_json::Value::Null,
        }
    }
}

impl AgentConfig {
    /// Config with the given agent-specific settings and default limits.
    pub fn with_settings(settings: serde_json::Value) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Look up a string setting by key.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.memory_ttl_secs, 3600);
    }

    #[test]
    fn test_setting_str() {
        let config = AgentConfig::with_settings(serde_json::json!({"template": "hi {input}", "n": 3}));
        assert_eq!(config.setting_str("template"), Some("hi {input}"));
        assert_eq!(config.setting_str("n"), None);
        assert_eq!(config.setting_str("missing"), None);
    }
}
