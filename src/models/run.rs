//! Summary of one ingestion run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{FailureStage, IngestError};
use crate::host::{serialize_target_counts, MeasureTarget};
use crate::models::dialect::Dialect;

/// A report that was skipped because of a per-report failure.
#[derive(Debug, Clone, Serialize)]
pub struct ReportFailure {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

impl ReportFailure {
    pub fn from_error(path: PathBuf, error: &IngestError) -> Self {
        Self {
            path,
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// A structured-report entry that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub record_index: usize,
    pub field: String,
    pub message: String,
}

/// Counts published through the host metric interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishedCounts {
    pub per_file: BTreeMap<String, u64>,
    pub project_total: u64,
}

/// Outcome of one dialect run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub dialect: Dialect,
    pub metric_key: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub reports_found: usize,
    pub reports_failed: usize,
    pub failures: Vec<ReportFailure>,
    /// Records emitted by the parsers, before validation.
    pub total_parsed: usize,
    pub record_errors: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub reported: usize,
    /// Valid occurrences per file including suppressed duplicates. Never
    /// published; `published` carries the forwarded counts.
    #[serde(serialize_with = "serialize_target_counts")]
    pub raw_occurrences: BTreeMap<MeasureTarget, u64>,
    /// `None` when no metric sink accepted the dialect's metric.
    pub published: Option<PublishedCounts>,
}

impl RunSummary {
    pub fn new(dialect: Dialect, metric_key: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            dialect,
            metric_key: metric_key.to_string(),
            started_at: now,
            completed_at: now,
            reports_found: 0,
            reports_failed: 0,
            failures: Vec::new(),
            total_parsed: 0,
            record_errors: 0,
            invalid: 0,
            duplicates: 0,
            reported: 0,
            raw_occurrences: BTreeMap::new(),
            published: None,
        }
    }

    pub fn record_failure(&mut self, failure: ReportFailure) {
        self.reports_failed += 1;
        self.failures.push(failure);
    }

    pub fn complete(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }
}
