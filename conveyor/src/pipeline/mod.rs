//! The dispatch engine: drives one pass from a source into a sink.

mod config;
mod progress;
mod worker;

#[cfg(test)]
mod engine_tests;

pub use config::PipelineConfig;
pub use progress::ProgressCounter;

use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::analyzer::{DiagnosticRouter, ErrorAnalyzer, ErrorContext};
use crate::cancellation::CancellationToken;
use crate::core::{QueryParams, Record, RunStats};
use crate::errors::PipelineError;
use crate::observability::{NoOpObserver, PipelineObserver};
use crate::sinks::Sink;
use crate::sources::Source;

/// Moves records from a source to a sink, tracking per-record outcomes.
///
/// With `worker_count == 1` the calling thread performs both fetch and
/// insert, preserving fetch order. With more workers, records fan out over
/// a bounded queue to a fixed pool of OS threads and no ordering is
/// guaranteed. In either mode a failing insert is counted and reported
/// without stopping the run; a failing source aborts it.
///
/// A `Pipeline` executes one pass per [`run`] call. It may be run again if
/// the source supports re-iteration; that is a source property the engine
/// does not enforce.
///
/// [`run`]: Pipeline::run
pub struct Pipeline {
    source: Box<dyn Source>,
    sink: Arc<dyn Sink>,
    config: PipelineConfig,
    diagnostics: DiagnosticRouter,
    observer: Arc<dyn PipelineObserver>,
    cancel: Option<Arc<CancellationToken>>,
    progress: ProgressCounter,
}

impl Pipeline {
    /// Creates a pipeline over a source and sink.
    #[must_use]
    pub fn new(source: impl Source + 'static, sink: Arc<dyn Sink>, config: PipelineConfig) -> Self {
        Self {
            source: Box::new(source),
            sink,
            config,
            diagnostics: DiagnosticRouter::disabled(),
            observer: Arc::new(NoOpObserver),
            cancel: None,
            progress: ProgressCounter::new(),
        }
    }

    /// Attaches a diagnostic analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn ErrorAnalyzer>) -> Self {
        self.diagnostics = DiagnosticRouter::new(analyzer);
        self
    }

    /// Attaches an observer for run/record extension points.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Attaches a cancellation token polled between records.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Handle over the monotonic total-processed counter, readable from any
    /// thread during the run. Includes skipped and errored records.
    #[must_use]
    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }

    /// Current value of the total-processed counter.
    #[must_use]
    pub fn total_processed(&self) -> u64 {
        self.progress.get()
    }

    /// Executes one pass over the source.
    ///
    /// On normal completion the sink is finalized and its stats, merged
    /// with the engine-tracked error count, are returned. Only fatal
    /// errors — a broken source, a failing finalize, a worker panic, or
    /// cancellation — cross this boundary; per-record insert failures are
    /// folded into the returned [`RunStats`].
    pub fn run(&mut self, params: Option<&QueryParams>) -> Result<RunStats, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(
            pipeline_id = %self.config.pipeline_id,
            run_id = %run_id,
            workers = self.config.worker_count,
            "starting pipeline run"
        );
        self.observer.on_run_started(&self.config.pipeline_id, &run_id);

        let outcome = if self.config.is_inline() {
            self.run_inline(params)
        } else {
            self.run_parallel(params)
        }
        .and_then(|local_errors| {
            self.sink.finalize()?;
            Ok(local_errors)
        });

        match outcome {
            Ok(local_errors) => {
                let mut stats = self.sink.stats();
                stats.errors += local_errors;
                info!(
                    pipeline_id = %self.config.pipeline_id,
                    run_id = %run_id,
                    total_processed = self.progress.get(),
                    %stats,
                    elapsed = ?started.elapsed(),
                    "pipeline run completed"
                );
                self.observer.on_run_finished(&self.config.pipeline_id, &stats);
                Ok(stats)
            }
            Err(err) => {
                error!(
                    pipeline_id = %self.config.pipeline_id,
                    run_id = %run_id,
                    %err,
                    "pipeline run failed"
                );
                self.observer.on_run_failed(&self.config.pipeline_id);
                Err(err)
            }
        }
    }

    /// Closes the source and the sink.
    pub fn cleanup(&mut self) -> Result<(), PipelineError> {
        self.source.close()?;
        self.sink.close()?;
        Ok(())
    }

    fn cancelled_error(token: &CancellationToken) -> PipelineError {
        PipelineError::Cancelled {
            reason: token.reason().unwrap_or_else(|| "cancelled".to_string()),
        }
    }

    /// Single-threaded execution on the calling thread, in fetch order.
    fn run_inline(&mut self, params: Option<&QueryParams>) -> Result<u64, PipelineError> {
        let sink = Arc::clone(&self.sink);
        let diagnostics = self.diagnostics.clone();
        let observer = Arc::clone(&self.observer);
        let cancel = self.cancel.clone();
        let progress = self.progress.clone();

        let mut local_errors: u64 = 0;
        let stream = self.source.fetch(params)?;

        for item in stream {
            if let Some(token) = cancel.as_deref() {
                if token.is_cancelled() {
                    return Err(Self::cancelled_error(token));
                }
            }

            // A broken source is fatal; a broken single insert is not.
            let record = item?;
            match sink.insert(&record.id, &record.payload) {
                Ok(outcome) => {
                    let total = progress.increment();
                    observer.on_record_processed(&record.id, outcome);
                    if total % 100 == 0 {
                        info!(total_processed = total, "processed records");
                    }
                }
                Err(err) => {
                    let total = progress.increment();
                    local_errors += 1;
                    let context = ErrorContext::new("sink_insert")
                        .with_record_id(&record.id)
                        .with_total_processed(total);
                    diagnostics.report(&err.to_string(), &context);
                    observer.on_record_errored(&record.id);
                }
            }
        }

        Ok(local_errors)
    }

    /// Parallel execution: a bounded queue feeding `worker_count` threads.
    ///
    /// The producer blocks when the queue is full (backpressure). Dropping
    /// the sender after the stream is exhausted — or after a fatal
    /// producer-side error — is the workers' termination signal, so they
    /// never block forever on an aborted run.
    fn run_parallel(&mut self, params: Option<&QueryParams>) -> Result<u64, PipelineError> {
        let worker_count = self.config.worker_count;
        let (tx, rx) = bounded::<Record>(self.config.queue_capacity);

        let source = &mut self.source;
        let sink = &self.sink;
        let diagnostics = &self.diagnostics;
        let observer = &self.observer;
        let cancel = &self.cancel;
        let progress = &self.progress;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(worker_count);
            for index in 0..worker_count {
                let worker_name = format!("worker-{}", index + 1);
                let receiver = rx.clone();
                let sink = Arc::clone(sink);
                let diagnostics = diagnostics.clone();
                let observer = Arc::clone(observer);
                let cancel = cancel.clone();
                let progress = progress.clone();

                let handle = thread::Builder::new()
                    .name(worker_name.clone())
                    .spawn_scoped(scope, move || {
                        worker::worker_loop(
                            &worker_name,
                            &receiver,
                            sink.as_ref(),
                            &diagnostics,
                            observer.as_ref(),
                            cancel.as_deref(),
                            &progress,
                        )
                    })?;
                handles.push(handle);
            }
            // Workers hold their own clones; disconnect is driven by the
            // producer dropping `tx`.
            drop(rx);

            let mut produce_result: Result<(), PipelineError> = Ok(());
            match source.fetch(params) {
                Err(err) => produce_result = Err(err.into()),
                Ok(stream) => {
                    for item in stream {
                        if let Some(token) = cancel.as_deref() {
                            if token.is_cancelled() {
                                produce_result = Err(Self::cancelled_error(token));
                                break;
                            }
                        }
                        match item {
                            Ok(record) => {
                                let total = progress.increment();
                                if total % 100 == 0 {
                                    info!(total_processed = total, "queued records");
                                }
                                // Blocking send: backpressure against a slow
                                // sink. Fails only when every worker exited.
                                if tx.send(record).is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                produce_result = Err(err.into());
                                break;
                            }
                        }
                    }
                }
            }
            drop(tx);

            let mut local_errors: u64 = 0;
            let mut join_result: Result<(), PipelineError> = Ok(());
            for handle in handles {
                let worker = handle.thread().name().unwrap_or("worker").to_string();
                match handle.join() {
                    Ok(stats) => local_errors += stats.errors,
                    Err(_) => join_result = Err(PipelineError::WorkerPanicked { worker }),
                }
            }

            produce_result?;
            join_result?;
            Ok(local_errors)
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("total_processed", &self.progress.get())
            .finish()
    }
}
