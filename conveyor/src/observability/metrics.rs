//! In-process metric counters fed by observer events.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::RunStats;
use crate::observability::PipelineObserver;
use crate::sinks::InsertOutcome;

/// Point-in-time view of the registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Runs that started.
    pub runs_started: u64,
    /// Runs that finished normally.
    pub runs_completed: u64,
    /// Runs that aborted with a fatal error.
    pub runs_failed: u64,
    /// Records handed to the sink (inserted + skipped + errored).
    pub records_processed: u64,
    /// Records the sink accepted.
    pub records_inserted: u64,
    /// Records skipped as duplicates.
    pub records_skipped: u64,
    /// Records whose insert failed.
    pub records_failed: u64,
}

/// Atomic counters for pipeline throughput and run outcomes.
///
/// Wire it into a pipeline as the observer, then read [`snapshot`] after
/// (or during) the run:
///
/// ```rust,ignore
/// let registry = Arc::new(MetricsRegistry::new());
/// let pipeline = Pipeline::new(source, sink, config)
///     .with_observer(registry.clone());
/// ```
///
/// [`snapshot`]: MetricsRegistry::snapshot
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    records_processed: AtomicU64,
    records_inserted: AtomicU64,
    records_skipped: AtomicU64,
    records_failed: AtomicU64,
}

impl MetricsRegistry {
    /// Creates a zeroed registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            records_processed: self.records_processed.load(Ordering::Relaxed),
            records_inserted: self.records_inserted.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
        }
    }
}

impl PipelineObserver for MetricsRegistry {
    fn on_run_started(&self, _pipeline_id: &str, _run_id: &str) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    fn on_record_processed(&self, _record_id: &str, outcome: InsertOutcome) {
        self.records_processed.fetch_add(1, Ordering::Relaxed);
        match outcome {
            InsertOutcome::Inserted => self.records_inserted.fetch_add(1, Ordering::Relaxed),
            InsertOutcome::Duplicate => self.records_skipped.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn on_record_errored(&self, _record_id: &str) {
        self.records_processed.fetch_add(1, Ordering::Relaxed);
        self.records_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_run_finished(&self, _pipeline_id: &str, _stats: &RunStats) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_run_failed(&self, _pipeline_id: &str) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_events() {
        let registry = MetricsRegistry::new();
        registry.on_run_started("p", "r");
        registry.on_record_processed("1", InsertOutcome::Inserted);
        registry.on_record_processed("2", InsertOutcome::Duplicate);
        registry.on_record_errored("3");
        registry.on_run_finished("p", &RunStats::default());

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.runs_started, 1);
        assert_eq!(snapshot.runs_completed, 1);
        assert_eq!(snapshot.runs_failed, 0);
        assert_eq!(snapshot.records_processed, 3);
        assert_eq!(snapshot.records_inserted, 1);
        assert_eq!(snapshot.records_skipped, 1);
        assert_eq!(snapshot.records_failed, 1);
    }

    #[test]
    fn failed_run_counter() {
        let registry = MetricsRegistry::new();
        registry.on_run_started("p", "r");
        registry.on_run_failed("p");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.runs_failed, 1);
        assert_eq!(snapshot.runs_completed, 0);
    }
}
