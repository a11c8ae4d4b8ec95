//! Ingestion pipeline orchestrating discovery, parsing, validation and reporting.
//!
//! One run covers one dialect: reports are located, parsed (optionally in
//! parallel), and their records are normalized and fed through a single
//! validation gate into the issue reporter in discovery order. Counters are
//! published once at the end of the run. Per-report failures are logged and
//! recorded in the run summary; only host errors abort a run.

use std::path::Path;

use rayon::prelude::*;

use crate::config::{DialectConfig, IngestConfig};
use crate::errors::IngestError;
use crate::host::Host;
use crate::models::diagnostic::Diagnostic;
use crate::models::report::ReportSource;
use crate::models::run::{ReportFailure, RunSummary};
use crate::parsers::{self, ParseOutput};
use crate::services::deduplication::{Admission, DedupGate};
use crate::services::normalizer::normalize;
use crate::services::reporter::{target_of, IssueReporter};
use crate::services::{locator, metrics};

/// Run every configured dialect, each as its own run.
pub fn ingest_all(config: &IngestConfig, host: &mut Host<'_>) -> Result<Vec<RunSummary>, IngestError> {
    let mut summaries = Vec::with_capacity(config.dialects.len());
    for dialect in &config.dialects {
        summaries.push(run_dialect(dialect, config.base_dir(), config.parallel, host)?);
    }
    Ok(summaries)
}

/// Run the full pipeline for one dialect.
///
/// A dialect without report paths yields an empty summary and no host
/// calls. Returns an error only when the host rejects a call.
pub fn run_dialect(
    config: &DialectConfig,
    base_dir: &Path,
    parallel: bool,
    host: &mut Host<'_>,
) -> Result<RunSummary, IngestError> {
    let mut summary = RunSummary::new(config.dialect, &config.metric_key);

    let located = match locator::locate(config, base_dir) {
        Ok(located) => located,
        Err(e) if e.is_not_configured() => return Ok(summary.complete()),
        Err(e) => return Err(e),
    };

    tracing::info!(
        run_id = %summary.run_id,
        dialect = %config.dialect,
        reports = located.sources.len(),
        parallel,
        "Starting ingestion run"
    );

    for path in located.missing {
        let error = IngestError::ReportNotFound { path: path.clone() };
        summary.record_failure(ReportFailure::from_error(path, &error));
    }
    summary.reports_found = located.sources.len();

    let catalog = host.catalog;
    let parser = parsers::parser_for(config.dialect.kind(), catalog, &config.repository);

    let mut run = RunState {
        gate: DedupGate::new(),
        reporter: IssueReporter::new(&mut *host.issues, &config.repository),
        summary,
    };

    if parallel {
        let parsed: Vec<_> = located
            .sources
            .par_iter()
            .map(|source| parser.parse(source))
            .collect();
        for (source, result) in located.sources.iter().zip(parsed) {
            run.absorb(source, result)?;
        }
    } else {
        for source in &located.sources {
            run.absorb(source, parser.parse(source))?;
        }
    }

    let RunState {
        gate,
        reporter,
        mut summary,
    } = run;
    let stats = gate.stats();
    summary.invalid = stats.invalid;
    summary.duplicates = stats.duplicates;
    summary.reported = stats.accepted;

    let counter = reporter.finish();
    summary.published = metrics::publish(&counter, &config.metric_key, host.metrics.as_deref_mut())?;

    let summary = summary.complete();
    tracing::info!(
        run_id = %summary.run_id,
        dialect = %config.dialect,
        reports_found = summary.reports_found,
        reports_failed = summary.reports_failed,
        total_parsed = summary.total_parsed,
        invalid = summary.invalid,
        duplicates = summary.duplicates,
        reported = summary.reported,
        "Ingestion run completed"
    );

    Ok(summary)
}

/// Mutable state of one run while reports are fed through the gate.
struct RunState<'h> {
    gate: DedupGate,
    reporter: IssueReporter<'h>,
    summary: RunSummary,
}

impl RunState<'_> {
    /// Feed one report's parse result through validation and reporting.
    fn absorb(
        &mut self,
        source: &ReportSource,
        result: Result<ParseOutput, IngestError>,
    ) -> Result<(), IngestError> {
        let output = match result {
            Ok(output) => output,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                match &e {
                    IngestError::ReportNotFound { .. } => {
                        tracing::warn!(error = %e, "Report disappeared before parsing, skipping")
                    }
                    _ => tracing::error!(error = %e, "Cannot process report, skipping"),
                }
                self.summary
                    .record_failure(ReportFailure::from_error(source.path.clone(), &e));
                return Ok(());
            }
        };

        for err in &output.errors {
            tracing::warn!(
                path = %source.path.display(),
                record_index = err.record_index,
                field = %err.field,
                message = %err.message,
                "Skipping malformed report entry"
            );
        }
        self.summary.total_parsed += output.records.len();
        self.summary.record_errors += output.errors.len();

        let before = self.reporter.reported();
        for raw in output.records {
            let diagnostic = normalize(raw);
            match self.gate.admit(&diagnostic) {
                Admission::Accepted(_) => {
                    self.reporter.report(&diagnostic)?;
                    self.count_occurrence(&diagnostic);
                }
                Admission::Duplicate(_) => self.count_occurrence(&diagnostic),
                Admission::Invalid => {}
            }
        }

        tracing::info!(
            path = %source.path.display(),
            issues = self.reporter.reported() - before,
            "Report processed"
        );
        Ok(())
    }

    fn count_occurrence(&mut self, diagnostic: &Diagnostic) {
        *self
            .summary
            .raw_occurrences
            .entry(target_of(diagnostic))
            .or_insert(0) += 1;
    }
}
