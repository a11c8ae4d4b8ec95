//! Forwarding accepted diagnostics to the host.
//!
//! The reporter is the only writer of the per-file occurrence counter, so
//! the counter always equals what the issue sink actually received.

use std::collections::BTreeMap;

use crate::errors::HostError;
use crate::host::{IssueSink, MeasureTarget};
use crate::models::diagnostic::Diagnostic;

/// Occurrences forwarded per file in one run. Unlocated diagnostics are
/// counted under `MeasureTarget::Project`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOccurrenceCounter {
    counts: BTreeMap<MeasureTarget, u64>,
}

impl FileOccurrenceCounter {
    fn increment(&mut self, target: MeasureTarget) {
        *self.counts.entry(target).or_insert(0) += 1;
    }

    pub fn get(&self, target: &MeasureTarget) -> u64 {
        self.counts.get(target).copied().unwrap_or(0)
    }

    /// Sum over every bucket, the project bucket included.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MeasureTarget, u64)> {
        self.counts.iter().map(|(target, count)| (target, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Measure target a diagnostic is counted under.
pub fn target_of(diagnostic: &Diagnostic) -> MeasureTarget {
    match &diagnostic.file {
        Some(path) => MeasureTarget::File(path.clone()),
        None => MeasureTarget::Project,
    }
}

/// Reports accepted diagnostics for one rule repository.
pub struct IssueReporter<'h> {
    sink: &'h mut dyn IssueSink,
    repository: &'h str,
    counter: FileOccurrenceCounter,
}

impl<'h> IssueReporter<'h> {
    pub fn new(sink: &'h mut dyn IssueSink, repository: &'h str) -> Self {
        Self {
            sink,
            repository,
            counter: FileOccurrenceCounter::default(),
        }
    }

    /// Record one violation and count it against its file.
    ///
    /// The counter is only touched after the host accepted the violation.
    pub fn report(&mut self, diagnostic: &Diagnostic) -> Result<(), HostError> {
        self.sink.record_violation(self.repository, diagnostic)?;
        self.counter.increment(target_of(diagnostic));
        tracing::debug!(
            repository = self.repository,
            file = diagnostic.file.as_deref().unwrap_or_default(),
            line = diagnostic.line,
            rule_id = %diagnostic.rule_id,
            "Violation recorded"
        );
        Ok(())
    }

    /// Violations recorded so far.
    pub fn reported(&self) -> u64 {
        self.counter.total()
    }

    pub fn counter(&self) -> &FileOccurrenceCounter {
        &self.counter
    }

    pub fn finish(self) -> FileOccurrenceCounter {
        self.counter
    }
}
