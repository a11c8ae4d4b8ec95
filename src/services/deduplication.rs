//! Validation and in-run deduplication of diagnostics.
//!
//! The gate sits between the normalizer and the issue reporter. Invalid
//! diagnostics are logged and dropped; valid ones pass only the first time
//! their dedup key is seen. One gate lives for exactly one run.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::diagnostic::{DedupKey, Diagnostic};
use crate::services::fingerprint;

/// Outcome of offering a diagnostic to the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Admission {
    /// First occurrence in this run; forward to the reporter.
    Accepted(DedupKey),
    /// Key already seen in this run.
    Duplicate(DedupKey),
    /// Empty rule id or message.
    Invalid,
}

/// Counters kept by the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub accepted: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Validation and dedup gate for one run.
#[derive(Debug, Default)]
pub struct DedupGate {
    seen: HashSet<DedupKey>,
    stats: GateStats,
}

impl DedupGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `diagnostic` and check it against the keys seen so far.
    pub fn admit(&mut self, diagnostic: &Diagnostic) -> Admission {
        if !diagnostic.is_valid() {
            tracing::warn!(
                file = diagnostic.file.as_deref().unwrap_or_default(),
                line = diagnostic.line,
                rule_id = %diagnostic.rule_id,
                message = %diagnostic.message,
                "Skipping invalid diagnostic"
            );
            self.stats.invalid += 1;
            return Admission::Invalid;
        }

        let key = fingerprint::dedup_key(diagnostic);
        if self.seen.insert(key.clone()) {
            self.stats.accepted += 1;
            Admission::Accepted(key)
        } else {
            tracing::debug!(
                key = %key,
                rule_id = %diagnostic.rule_id,
                "Duplicate diagnostic suppressed"
            );
            self.stats.duplicates += 1;
            Admission::Duplicate(key)
        }
    }

    pub fn stats(&self) -> GateStats {
        self.stats
    }
}
