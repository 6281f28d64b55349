//! Observer-based instrumentation.
//!
//! Instrumentation is a cross-cutting concern injected as an observer rather
//! than branched into the dispatch logic. The engine fires the extension
//! points defined on [`PipelineObserver`]; implementations decide what to do
//! with them (nothing, log lines, metric counters, test capture).

mod metrics;

pub use metrics::{MetricsRegistry, MetricsSnapshot};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::RunStats;
use crate::sinks::InsertOutcome;

/// Extension points the engine fires during a run.
///
/// All methods default to no-ops, so implementations subscribe only to the
/// events they care about. Methods are called from worker threads under
/// parallel execution and must not block for long.
pub trait PipelineObserver: Send + Sync {
    /// A run is starting.
    fn on_run_started(&self, pipeline_id: &str, run_id: &str) {
        let _ = (pipeline_id, run_id);
    }

    /// A record was handed to the sink and classified.
    fn on_record_processed(&self, record_id: &str, outcome: InsertOutcome) {
        let _ = (record_id, outcome);
    }

    /// A record's insert failed.
    fn on_record_errored(&self, record_id: &str) {
        let _ = record_id;
    }

    /// A run completed normally with final stats.
    fn on_run_finished(&self, pipeline_id: &str, stats: &RunStats) {
        let _ = (pipeline_id, stats);
    }

    /// A run aborted with a fatal error.
    fn on_run_failed(&self, pipeline_id: &str) {
        let _ = pipeline_id;
    }
}

/// An observer that ignores every event.
///
/// The default when no observer is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl PipelineObserver for NoOpObserver {}

/// An observer that emits tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_run_started(&self, pipeline_id: &str, run_id: &str) {
        info!(pipeline_id, run_id, "run started");
    }

    fn on_record_processed(&self, record_id: &str, outcome: InsertOutcome) {
        debug!(record_id, ?outcome, "record processed");
    }

    fn on_record_errored(&self, record_id: &str) {
        debug!(record_id, "record errored");
    }

    fn on_run_finished(&self, pipeline_id: &str, stats: &RunStats) {
        info!(pipeline_id, %stats, "run finished");
    }

    fn on_run_failed(&self, pipeline_id: &str) {
        warn!(pipeline_id, "run failed");
    }
}

/// A recorded observer event, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    /// `on_run_started` fired.
    RunStarted {
        /// Pipeline id from the config.
        pipeline_id: String,
        /// Generated run id.
        run_id: String,
    },
    /// `on_record_processed` fired.
    RecordProcessed {
        /// Record id.
        record_id: String,
        /// Sink classification.
        outcome: InsertOutcome,
    },
    /// `on_record_errored` fired.
    RecordErrored {
        /// Record id.
        record_id: String,
    },
    /// `on_run_finished` fired.
    RunFinished {
        /// Pipeline id from the config.
        pipeline_id: String,
        /// Final stats.
        stats: RunStats,
    },
    /// `on_run_failed` fired.
    RunFailed {
        /// Pipeline id from the config.
        pipeline_id: String,
    },
}

/// An observer that collects events for test assertions.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true when nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl PipelineObserver for CollectingObserver {
    fn on_run_started(&self, pipeline_id: &str, run_id: &str) {
        self.events.lock().push(ObserverEvent::RunStarted {
            pipeline_id: pipeline_id.to_string(),
            run_id: run_id.to_string(),
        });
    }

    fn on_record_processed(&self, record_id: &str, outcome: InsertOutcome) {
        self.events.lock().push(ObserverEvent::RecordProcessed {
            record_id: record_id.to_string(),
            outcome,
        });
    }

    fn on_record_errored(&self, record_id: &str) {
        self.events.lock().push(ObserverEvent::RecordErrored {
            record_id: record_id.to_string(),
        });
    }

    fn on_run_finished(&self, pipeline_id: &str, stats: &RunStats) {
        self.events.lock().push(ObserverEvent::RunFinished {
            pipeline_id: pipeline_id.to_string(),
            stats: *stats,
        });
    }

    fn on_run_failed(&self, pipeline_id: &str) {
        self.events.lock().push(ObserverEvent::RunFailed {
            pipeline_id: pipeline_id.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_observer_ignores_everything() {
        let observer = NoOpObserver;
        observer.on_run_started("p", "r");
        observer.on_record_processed("1", InsertOutcome::Inserted);
        observer.on_run_failed("p");
    }

    #[test]
    fn collecting_observer_records_events() {
        let observer = CollectingObserver::new();
        assert!(observer.is_empty());

        observer.on_run_started("p", "run-1");
        observer.on_record_processed("1", InsertOutcome::Inserted);
        observer.on_record_errored("2");

        let events = observer.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            ObserverEvent::RecordProcessed {
                record_id: "1".to_string(),
                outcome: InsertOutcome::Inserted,
            }
        );
    }
}
