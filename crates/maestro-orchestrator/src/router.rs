use crate::classifier::QueryClassifier;
use maestro_core::{AgentDescriptor, MaestroError, MaestroResult, QueryContext};
use maestro_registry::{AgentDiscovery, AgentRegistry};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Last-resort agent id. Must be registered.
    pub default_agent: String,
    /// Ids tried in order when scoring yields nothing usable.
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    /// Rule key → additive boost. A rule applies to an agent that declares
    /// the key as a capability when the request matches the key.
    #[serde(default)]
    pub priority_rules: BTreeMap<String, i64>,
}

impl RouterConfig {
    /// Config with no fallback chain and no rules.
    pub fn new(default_agent: impl Into<String>) -> Self {
        Self {
            default_agent: default_agent.into(),
            fallback_chain: Vec::new(),
            priority_rules: BTreeMap::new(),
        }
    }

    /// Replace the fallback chain.
    pub fn with_fallback_chain<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_chain = chain.into_iter().map(Into::into).collect();
        self
    }

    /// Add or replace a priority rule.
    pub fn with_priority_rule(mut self, key: impl Into<String>, boost: i64) -> Self {
        self.priority_rules.insert(key.into(), boost);
        self
    }
}

/// Score breakdown for one candidate agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentScore {
    /// Scored agent.
    pub agent_id: String,
    /// Number of relevant capabilities the agent declares.
    pub base: i64,
    /// Sum of applicable priority-rule boosts.
    pub boost: i64,
    /// The descriptor's priority hint (0 when absent).
    pub hint: i64,
    /// `base + boost + hint`, saturating.
    pub total: i64,
    /// Position in the candidate list (registration order).
    pub position: usize,
}

impl AgentScore {
    /// Whether the agent matched the query at all.
    pub fn is_match(&self) -> bool {
        self.base.saturating_add(self.boost) > 0
    }

    /// Total order: higher total, then higher hint, then earlier position.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .total
            .cmp(&self.total)
            .then_with(|| other.hint.cmp(&self.hint))
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Scores registered agents for a query and picks the best one.
pub struct QueryRouter {
    config: RouterConfig,
    discovery: Arc<AgentDiscovery>,
    classifier: Arc<dyn QueryClassifier>,
}

impl QueryRouter {
    /// Router over `discovery` using `classifier` for relevance.
    pub fn new(
        config: RouterConfig,
        discovery: Arc<AgentDiscovery>,
        classifier: Arc<dyn QueryClassifier>,
    ) -> Self {
        Self {
            config,
            discovery,
            classifier,
        }
    }

    /// Routing configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Discovery used for required capabilities.
    pub fn discovery(&self) -> &Arc<AgentDiscovery> {
        &self.discovery
    }

    fn registry(&self) -> &Arc<AgentRegistry> {
        self.discovery.registry()
    }

    /// Startup check: the default agent must be registered.
    pub fn validate(&self) -> MaestroResult<()> {
        if !self.registry().contains(&self.config.default_agent) {
            return Err(MaestroError::Config(format!(
                "default agent '{}' is not registered",
                self.config.default_agent
            )));
        }
        for id in &self.config.fallback_chain {
            if !self.registry().contains(id) {
                warn!(agent_id = %id, "Fallback chain references an unregistered agent");
            }
        }
        Ok(())
    }

    /// Score every candidate and return them best-first.
    ///
    /// Pure function of its inputs: the registry is not consulted.
    pub fn rank(
        &self,
        query: &str,
        context: &QueryContext,
        candidates: &[AgentDescriptor],
    ) -> Vec<AgentScore> {
        let relevant = self.classifier.classify(query, context);

        let mut scores: Vec<AgentScore> = candidates
            .iter()
            .enumerate()
            .map(|(position, descriptor)| {
                let base = descriptor.capabilities.intersection(&relevant).count() as i64;
                let boost = self
                    .config
                    .priority_rules
                    .iter()
                    .filter(|(key, _)| {
                        let requested = relevant.contains(key.as_str())
                            || context.query_type.as_deref() == Some(key.as_str());
                        requested && descriptor.has_capability(key)
                    })
                    .fold(0i64, |acc, (_, boost)| acc.saturating_add(*boost));
                let hint = descriptor.priority_hint.unwrap_or(0);
                AgentScore {
                    agent_id: descriptor.agent_id.clone(),
                    base,
                    boost,
                    hint,
                    total: base.saturating_add(boost).saturating_add(hint),
                    position,
                }
            })
            .collect();

        scores.sort_by(AgentScore::rank_cmp);
        scores
    }

    /// Pick an agent id from an explicit candidate list, applying the
    /// fallback chain and default agent when the best match is unusable.
    ///
    /// Candidates with `base + boost == 0` are skipped even when their hint
    /// gives them the highest total: the hint only orders agents that matched.
    pub fn select(
        &self,
        query: &str,
        context: &QueryContext,
        candidates: &[AgentDescriptor],
    ) -> MaestroResult<String> {
        let scores = self.rank(query, context, candidates);
        match scores.iter().find(|s| s.is_match()) {
            Some(best) if self.registry().contains(&best.agent_id) => {
                debug!(
                    agent_id = %best.agent_id,
                    total = best.total,
                    base = best.base,
                    boost = best.boost,
                    hint = best.hint,
                    "Routed query"
                );
                return Ok(best.agent_id.clone());
            }
            Some(best) => {
                warn!(agent_id = %best.agent_id, "Top-scored agent is not registered, using fallback");
            }
            None => {
                debug!("No agent matched the query, using fallback");
            }
        }
        self.fallback()
    }

    /// Route a query over the currently registered agents.
    ///
    /// When the context lists required capabilities, only agents covering
    /// at least one of them are scored.
    pub fn route_query(&self, query: &str, context: &QueryContext) -> MaestroResult<String> {
        let mut candidates = self.registry().descriptors();
        if !context.required_capabilities.is_empty() {
            let allowed = self
                .discovery
                .analyze_requirements(&context.required_capabilities);
            candidates.retain(|d| allowed.contains(&d.agent_id));
        }
        self.select(query, context, &candidates)
    }

    fn fallback(&self) -> MaestroResult<String> {
        if let Some(id) = self
            .config
            .fallback_chain
            .iter()
            .find(|id| self.registry().contains(id))
        {
            debug!(agent_id = %id, "Routed via fallback chain");
            return Ok(id.clone());
        }
        if self.registry().contains(&self.config.default_agent) {
            debug!(agent_id = %self.config.default_agent, "Routed to default agent");
            return Ok(self.config.default_agent.clone());
        }
        Err(MaestroError::RoutingExhausted(
            self.config.default_agent.clone(),
        ))
    }
}
