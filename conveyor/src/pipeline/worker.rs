//! Worker loop for parallel execution.

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::analyzer::{DiagnosticRouter, ErrorContext};
use crate::cancellation::CancellationToken;
use crate::core::Record;
use crate::observability::PipelineObserver;
use crate::pipeline::ProgressCounter;
use crate::sinks::{InsertOutcome, Sink};

/// Outcome counters local to one worker, merged by the engine at join time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WorkerStats {
    pub(crate) processed: u64,
    pub(crate) inserted: u64,
    pub(crate) skipped: u64,
    pub(crate) errors: u64,
}

/// Drains the shared queue until the channel disconnects.
///
/// Each record is delivered to exactly one worker. A failed insert is
/// counted and reported but never crashes the worker or the pool. The
/// channel disconnect — the producer dropping its sender after the stream
/// is exhausted — is the termination signal; it is only observable once
/// all queued work has been dequeued.
pub(crate) fn worker_loop(
    worker_name: &str,
    receiver: &Receiver<Record>,
    sink: &dyn Sink,
    diagnostics: &DiagnosticRouter,
    observer: &dyn PipelineObserver,
    cancel: Option<&CancellationToken>,
    progress: &ProgressCounter,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    for record in receiver.iter() {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            break;
        }

        stats.processed += 1;
        match sink.insert(&record.id, &record.payload) {
            Ok(outcome) => {
                match outcome {
                    InsertOutcome::Inserted => stats.inserted += 1,
                    InsertOutcome::Duplicate => stats.skipped += 1,
                }
                observer.on_record_processed(&record.id, outcome);
            }
            Err(err) => {
                stats.errors += 1;
                let context = ErrorContext::new("sink_insert")
                    .with_record_id(&record.id)
                    .with_total_processed(progress.get());
                diagnostics.report(&err.to_string(), &context);
                observer.on_record_errored(&record.id);
            }
        }

        if stats.processed % 100 == 0 {
            debug!(worker = worker_name, ?stats, "worker progress");
        }
    }

    info!(
        worker = worker_name,
        processed = stats.processed,
        inserted = stats.inserted,
        skipped = stats.skipped,
        errors = stats.errors,
        "worker finished"
    );
    stats
}
