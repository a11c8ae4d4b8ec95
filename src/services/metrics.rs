//! Publishing occurrence counters through the host metric interface.

use crate::errors::HostError;
use crate::host::{MeasureTarget, MetricSink};
use crate::models::run::PublishedCounts;
use crate::services::reporter::FileOccurrenceCounter;

/// Publish per-file counts and the project total under `metric_key`.
///
/// Returns `Ok(None)` without touching the host when there is no metric
/// sink or the sink does not know the metric. The project total is the
/// sum of every bucket, so unlocated diagnostics count towards it even
/// though they have no file measure.
pub fn publish(
    counter: &FileOccurrenceCounter,
    metric_key: &str,
    sink: Option<&mut (dyn MetricSink + '_)>,
) -> Result<Option<PublishedCounts>, HostError> {
    let Some(sink) = sink else {
        tracing::debug!(metric = metric_key, "No metric interface, skipping aggregation");
        return Ok(None);
    };
    if !sink.is_registered(metric_key) {
        tracing::debug!(metric = metric_key, "Metric not registered, skipping aggregation");
        return Ok(None);
    }

    let mut published = PublishedCounts::default();
    for (target, count) in counter.iter() {
        if let MeasureTarget::File(path) = target {
            sink.increment_counter(metric_key, target, count)?;
            published.per_file.insert(path.clone(), count);
        }
    }

    let total = counter.total();
    sink.increment_counter(metric_key, &MeasureTarget::Project, total)?;
    published.project_total = total;

    tracing::debug!(
        metric = metric_key,
        files = published.per_file.len(),
        total,
        "Metrics published"
    );

    Ok(Some(published))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{IssueSink, MemoryIssueStore, MemoryMetricStore};
    use crate::models::diagnostic::Diagnostic;
    use crate::services::reporter::IssueReporter;

    const METRIC: &str = "CXX-COMPILER.GCC";

    fn counter(files: &[Option<&str>]) -> FileOccurrenceCounter {
        let mut store = MemoryIssueStore::new();
        let mut reporter = IssueReporter::new(&mut store as &mut dyn IssueSink, "compiler-gcc");
        for (i, file) in files.iter().enumerate() {
            reporter
                .report(&Diagnostic {
                    file: file.map(str::to_string),
                    line: None,
                    rule_id: "-Wall".to_string(),
                    message: format!("m{i}"),
                })
                .unwrap();
        }
        reporter.finish()
    }

    #[test]
    fn publishes_file_counts_and_total() {
        let counter = counter(&[Some("a.c"), Some("a.c"), Some("b.c"), None]);
        let mut metrics = MemoryMetricStore::new();

        let published = publish(&counter, METRIC, Some(&mut metrics)).unwrap().unwrap();

        assert_eq!(published.per_file["a.c"], 2);
        assert_eq!(published.per_file["b.c"], 1);
        assert_eq!(published.project_total, 4);
        assert_eq!(
            metrics.measure(METRIC, &MeasureTarget::File("a.c".to_string())),
            Some(2)
        );
        assert_eq!(metrics.measure(METRIC, &MeasureTarget::Project), Some(4));
    }

    #[test]
    fn empty_counter_publishes_zero_total() {
        let mut metrics = MemoryMetricStore::new();
        let published = publish(&FileOccurrenceCounter::default(), METRIC, Some(&mut metrics))
            .unwrap()
            .unwrap();
        assert!(published.per_file.is_empty());
        assert_eq!(metrics.measure(METRIC, &MeasureTarget::Project), Some(0));
    }

    #[test]
    fn skipped_without_sink() {
        let counter = counter(&[Some("a.c")]);
        assert_eq!(publish(&counter, METRIC, None).unwrap(), None);
    }

    #[test]
    fn skipped_for_unregistered_metric() {
        let counter = counter(&[Some("a.c")]);
        let mut metrics = MemoryMetricStore::with_registered(["CXX-SCANBUILD"]);
        assert_eq!(publish(&counter, METRIC, Some(&mut metrics)).unwrap(), None);
        assert!(metrics.measures.is_empty());
    }
}
