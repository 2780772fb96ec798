use maestro_core::{Capability, QueryContext};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Strategy deciding which capability tags are relevant to a query.
///
/// The router counts, for every agent, how many of the returned tags the
/// agent declares. Keyword tables, embeddings or an LLM call can all sit
/// behind this trait; the router never looks at the query text itself.
pub trait QueryClassifier: Send + Sync {
    /// Capabilities relevant to `query`.
    fn classify(&self, query: &str, context: &QueryContext) -> BTreeSet<Capability>;
}

/// Keyword-table classifier.
///
/// A capability is relevant when any of its keywords occurs in the query
/// (case-insensitive). Single-word keywords match whole words only;
/// keywords containing a space match as a substring. The context's
/// `query_type`, when present, is always treated as a relevant capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordClassifier {
    #[serde(default)]
    keywords: BTreeMap<Capability, Vec<String>>,
}

impl KeywordClassifier {
    /// Classifier with an empty keyword table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add keywords for a capability.
    pub fn with_keywords<I, S>(mut self, capability: impl Into<Capability>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords
            .entry(capability.into())
            .or_default()
            .extend(keywords.into_iter().map(|k| k.into().to_lowercase()));
        self
    }

    /// The keyword table, lowercased.
    pub fn keywords(&self) -> &BTreeMap<Capability, Vec<String>> {
        &self.keywords
    }
}

impl QueryClassifier for KeywordClassifier {
    fn classify(&self, query: &str, context: &QueryContext) -> BTreeSet<Capability> {
        let lowered = query.to_lowercase();
        let words: BTreeSet<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '+' || c == '#'))
            .filter(|w| !w.is_empty())
            .collect();

        let mut relevant: BTreeSet<Capability> = self
            .keywords
            .iter()
            .filter(|(_, keywords)| {
                keywords.iter().any(|kw| {
                    let kw = kw.to_lowercase();
                    if kw.contains(' ') {
                        lowered.contains(&kw)
                    } else {
                        words.contains(kw.as_str())
                    }
                })
            })
            .map(|(capability, _)| capability.clone())
            .collect();

        if let Some(query_type) = &context.query_type {
            relevant.insert(query_type.clone());
        }
        relevant
    }
}

/// Classifier returning a fixed capability set regardless of the query.
#[derive(Debug, Clone, Default)]
pub struct FixedClassifier {
    capabilities: BTreeSet<Capability>,
}

impl FixedClassifier {
    /// Always return `capabilities`.
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

impl QueryClassifier for FixedClassifier {
    fn classify(&self, _query: &str, _context: &QueryContext) -> BTreeSet<Capability> {
        self.capabilities.clone()
    }
}
