//! Interfaces to the code-quality platform that consumes diagnostics.
//!
//! Ingestion only produces: it asks the rule catalog whether a rule exists,
//! records violations and increments counters. The `Memory*` types
//! implement each of them in memory for the binary and for tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::errors::HostError;
use crate::models::diagnostic::Diagnostic;

/// Rule catalog lookup.
pub trait RuleCatalog: Send + Sync {
    fn rule_exists(&self, repository: &str, rule: &str) -> bool;
}

/// Receives each accepted diagnostic exactly once per run.
pub trait IssueSink {
    fn record_violation(&mut self, repository: &str, diagnostic: &Diagnostic)
        -> Result<(), HostError>;
}

/// What a counter increment is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum MeasureTarget {
    File(String),
    Project,
}

impl MeasureTarget {
    pub fn file(path: impl Into<String>) -> Self {
        Self::File(path.into())
    }
}

impl std::fmt::Display for MeasureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{path}"),
            Self::Project => write!(f, "<project>"),
        }
    }
}

/// Counts keyed by target, serialized as a list of
/// `{"target": {"kind", "path"}, "value"}` entries so that a file path can
/// never be mistaken for the project bucket.
pub fn serialize_target_counts<S>(
    counts: &BTreeMap<MeasureTarget, u64>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(counts.iter().map(|(target, value)| TargetCount {
        target,
        value: *value,
    }))
}

#[derive(Serialize)]
struct TargetCount<'a> {
    target: &'a MeasureTarget,
    value: u64,
}

struct TargetCounts<'a>(&'a BTreeMap<MeasureTarget, u64>);

impl Serialize for TargetCounts<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_target_counts(self.0, serializer)
    }
}

fn serialize_measures<S>(
    measures: &BTreeMap<String, BTreeMap<MeasureTarget, u64>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(measures.iter().map(|(metric, counts)| (metric, TargetCounts(counts))))
}

/// Publishes occurrence counters.
pub trait MetricSink {
    /// Whether the host knows `metric`. Unregistered metrics are skipped.
    fn is_registered(&self, metric: &str) -> bool;

    fn increment_counter(
        &mut self,
        metric: &str,
        target: &MeasureTarget,
        amount: u64,
    ) -> Result<(), HostError>;
}

/// The collaborators one run talks to.
pub struct Host<'a> {
    pub catalog: &'a dyn RuleCatalog,
    pub issues: &'a mut dyn IssueSink,
    /// `None` when the platform exposes no metric interface.
    pub metrics: Option<&'a mut dyn MetricSink>,
}

impl<'a> Host<'a> {
    pub fn new(catalog: &'a dyn RuleCatalog, issues: &'a mut dyn IssueSink) -> Self {
        Self {
            catalog,
            issues,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a mut dyn MetricSink) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

// -- In-memory host --

/// Rule set keyed by `(repository, rule)`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryCatalog {
    rules: BTreeSet<(String, String)>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, repository: &str, rule: &str) -> Self {
        self.add_rule(repository, rule);
        self
    }

    pub fn add_rule(&mut self, repository: &str, rule: &str) {
        self.rules
            .insert((repository.to_string(), rule.to_string()));
    }

    /// Parse a `repository:rule` comma list. Entries without a colon are
    /// ignored.
    pub fn from_list(list: &str) -> Self {
        let mut catalog = Self::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if let Some((repository, rule)) = entry.split_once(':') {
                catalog.add_rule(repository.trim(), rule.trim());
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleCatalog for MemoryCatalog {
    fn rule_exists(&self, repository: &str, rule: &str) -> bool {
        self.rules
            .contains(&(repository.to_string(), rule.to_string()))
    }
}

/// A violation as the host stored it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedViolation {
    pub repository: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub rule_id: String,
    pub message: String,
}

/// Collects recorded violations in call order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryIssueStore {
    pub violations: Vec<RecordedViolation>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl IssueSink for MemoryIssueStore {
    fn record_violation(
        &mut self,
        repository: &str,
        diagnostic: &Diagnostic,
    ) -> Result<(), HostError> {
        self.violations.push(RecordedViolation {
            repository: repository.to_string(),
            file: diagnostic.file.clone(),
            line: diagnostic.line,
            rule_id: diagnostic.rule_id.clone(),
            message: diagnostic.message.clone(),
        });
        Ok(())
    }
}

/// Accumulates counters per metric and target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryMetricStore {
    /// metric key -> target -> accumulated value
    #[serde(serialize_with = "serialize_measures")]
    pub measures: BTreeMap<String, BTreeMap<MeasureTarget, u64>>,
    #[serde(skip)]
    registered: Option<BTreeSet<String>>,
}

impl MemoryMetricStore {
    /// A store that accepts every metric.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that only accepts the listed metrics.
    pub fn with_registered<I, S>(metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registered: Some(metrics.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn measure(&self, metric: &str, target: &MeasureTarget) -> Option<u64> {
        self.measures
            .get(metric)
            .and_then(|m| m.get(target))
            .copied()
    }
}

impl MetricSink for MemoryMetricStore {
    fn is_registered(&self, metric: &str) -> bool {
        self.registered
            .as_ref()
            .map_or(true, |registered| registered.contains(metric))
    }

    fn increment_counter(
        &mut self,
        metric: &str,
        target: &MeasureTarget,
        amount: u64,
    ) -> Result<(), HostError> {
        if !self.is_registered(metric) {
            return Err(HostError::new(
                "increment_counter",
                format!("metric {metric} is not registered"),
            ));
        }
        *self
            .measures
            .entry(metric.to_string())
            .or_default()
            .entry(target.clone())
            .or_default() += amount;
        Ok(())
    }
}
