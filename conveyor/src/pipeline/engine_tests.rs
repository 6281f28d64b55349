//! End-to-end engine tests over the in-crate test doubles.

use pretty_assertions::assert_eq;
use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::core::{Payload, Record, RunStats};
use crate::errors::PipelineError;
use crate::observability::{CollectingObserver, MetricsRegistry, ObserverEvent};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::sinks::MemorySink;
use crate::testing::{CollectingSink, FailingAnalyzer, PanickingAnalyzer, VecSource};

fn five_records() -> Vec<Record> {
    (1..=5)
        .map(|n| Record::new(n.to_string(), format!("payload-{n}")))
        .collect()
}

fn mixed_records() -> Vec<Record> {
    // Two duplicates and one failing id among eight records.
    vec![
        Record::new("1", "a"),
        Record::new("2", "b"),
        Record::new("1", "c"),
        Record::new("3", "d"),
        Record::new("bad", "e"),
        Record::new("4", "f"),
        Record::new("2", "g"),
        Record::new("5", "h"),
    ]
}

fn config(workers: usize) -> PipelineConfig {
    PipelineConfig::new().with_workers(workers)
}

#[test]
fn counts_sum_to_total_inline() {
    let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
    let mut pipeline = Pipeline::new(VecSource::new(mixed_records()), sink, config(1));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.total(), 8);
    assert_eq!(
        stats,
        RunStats {
            inserted: 5,
            skipped: 2,
            errors: 1
        }
    );
    assert_eq!(pipeline.total_processed(), 8);
}

#[test]
fn counts_sum_to_total_parallel() {
    let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
    let mut pipeline = Pipeline::new(VecSource::new(mixed_records()), sink, config(4));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.total(), 8);
    assert_eq!(stats.inserted, 5);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(pipeline.total_processed(), 8);
}

#[test]
fn duplicate_id_yields_one_insert_one_skip() {
    let source = VecSource::from_pairs(&[("dup", "first"), ("dup", "second")]);
    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(source, sink.clone(), config(1));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(
        stats,
        RunStats {
            inserted: 1,
            skipped: 1,
            errors: 0
        }
    );
    assert_eq!(sink.payload_of("dup"), Some(Payload::from("first")));
}

#[test]
fn stats_are_invariant_to_thread_count() {
    let mut results = Vec::new();
    for workers in [1, 2, 5, 20] {
        let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
        let mut pipeline = Pipeline::new(VecSource::new(mixed_records()), sink, config(workers));
        results.push(pipeline.run(None).unwrap());
    }

    for stats in &results[1..] {
        assert_eq!(stats, &results[0]);
    }
}

#[test]
fn one_failing_record_does_not_stop_the_run() {
    let mut records = five_records();
    records[3] = Record::new("bad", "payload-4");

    let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
    let mut pipeline = Pipeline::new(VecSource::new(records), sink.clone(), config(1));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.inserted, 4);
    assert_eq!(stats.errors, 1);
    // All five were attempted.
    assert_eq!(pipeline.total_processed(), 5);
    assert_eq!(sink.ids(), vec!["1", "2", "3", "5"]);
}

#[test]
fn rerun_against_fresh_sinks_is_idempotent() {
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let sink = Arc::new(CollectingSink::new());
        let mut pipeline = Pipeline::new(VecSource::new(five_records()), sink.clone(), config(1));
        let stats = pipeline.run(None).unwrap();
        outputs.push((stats, sink.records()));
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn first_write_wins_scenario() {
    let source = VecSource::from_pairs(&[("1", "a"), ("2", "b"), ("1", "c"), ("3", "d")]);
    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(source, sink.clone(), config(1));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(
        stats,
        RunStats {
            inserted: 3,
            skipped: 1,
            errors: 0
        }
    );
    assert_eq!(sink.ids(), vec!["1", "2", "3"]);
    assert_eq!(sink.payload_of("1"), Some(Payload::from("a")));
}

#[test]
fn source_failure_aborts_inline_run() {
    let source = VecSource::new(five_records()).failing_after(2);
    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(source, sink.clone(), config(1));

    let result = pipeline.run(None);
    assert!(matches!(result, Err(PipelineError::Source(_))));
    // The failed run never reached finalize.
    assert!(!sink.was_finalized());
    assert_eq!(pipeline.total_processed(), 2);
}

#[test]
fn source_failure_releases_parallel_workers() {
    let source = VecSource::new(five_records()).failing_after(2);
    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(source, sink, config(4));

    // Must terminate: dropping the sender releases every worker.
    let result = pipeline.run(None);
    assert!(matches!(result, Err(PipelineError::Source(_))));
}

#[test]
fn failing_analyzer_never_escapes_the_run() {
    let mut records = five_records();
    records[1] = Record::new("bad", "x");
    records[4] = Record::new("bad2", "y");

    let analyzer = Arc::new(FailingAnalyzer::new());
    let sink = Arc::new(
        CollectingSink::new()
            .with_failure_on("bad")
            .with_failure_on("bad2"),
    );
    let mut pipeline =
        Pipeline::new(VecSource::new(records), sink, config(1)).with_analyzer(analyzer.clone());

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.errors, 2);
    assert_eq!(analyzer.calls(), 2);
}

#[test]
fn panicking_analyzer_never_escapes_the_run() {
    let mut records = five_records();
    records[2] = Record::new("bad", "x");

    let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
    let mut pipeline = Pipeline::new(VecSource::new(records), sink, config(2))
        .with_analyzer(Arc::new(PanickingAnalyzer));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.inserted, 4);
}

#[test]
fn tiny_queue_capacity_does_not_deadlock() {
    let records: Vec<Record> = (0..200)
        .map(|n| Record::new(format!("r{n}"), "x"))
        .collect();
    let sink = Arc::new(MemorySink::new());
    let config = PipelineConfig::new().with_workers(4).with_queue_capacity(1);
    let mut pipeline = Pipeline::new(VecSource::new(records), sink.clone(), config);

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.inserted, 200);
    assert_eq!(sink.len(), 200);
}

#[test]
fn cancelled_token_aborts_inline_run() {
    let token = Arc::new(CancellationToken::new());
    token.cancel("operator stop");

    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(VecSource::new(five_records()), sink, config(1))
        .with_cancellation(token);

    let result = pipeline.run(None);
    assert!(matches!(result, Err(PipelineError::Cancelled { .. })));
}

#[test]
fn cancelled_token_aborts_parallel_run() {
    let token = Arc::new(CancellationToken::new());
    token.cancel("operator stop");

    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(VecSource::new(five_records()), sink, config(3))
        .with_cancellation(token);

    let result = pipeline.run(None);
    assert!(matches!(result, Err(PipelineError::Cancelled { .. })));
}

#[test]
fn observer_sees_the_run_lifecycle() {
    let observer = Arc::new(CollectingObserver::new());
    let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
    let source = VecSource::from_pairs(&[("1", "a"), ("bad", "b"), ("2", "c")]);
    let mut pipeline =
        Pipeline::new(source, sink, config(1)).with_observer(observer.clone());

    let stats = pipeline.run(None).unwrap();
    let events = observer.events();

    assert!(matches!(events[0], ObserverEvent::RunStarted { .. }));
    let processed = events
        .iter()
        .filter(|event| matches!(event, ObserverEvent::RecordProcessed { .. }))
        .count();
    let errored = events
        .iter()
        .filter(|event| matches!(event, ObserverEvent::RecordErrored { .. }))
        .count();
    assert_eq!(processed, 2);
    assert_eq!(errored, 1);
    assert_eq!(
        events.last(),
        Some(&ObserverEvent::RunFinished {
            pipeline_id: "default".to_string(),
            stats,
        })
    );
}

#[test]
fn metrics_registry_matches_run_stats() {
    let registry = Arc::new(MetricsRegistry::new());
    let sink = Arc::new(CollectingSink::new().with_failure_on("bad"));
    let mut pipeline = Pipeline::new(VecSource::new(mixed_records()), sink, config(4))
        .with_observer(registry.clone());

    let stats = pipeline.run(None).unwrap();
    let snapshot = registry.snapshot();

    assert_eq!(snapshot.runs_started, 1);
    assert_eq!(snapshot.runs_completed, 1);
    assert_eq!(snapshot.records_processed, stats.total());
    assert_eq!(snapshot.records_inserted, stats.inserted);
    assert_eq!(snapshot.records_skipped, stats.skipped);
    assert_eq!(snapshot.records_failed, stats.errors);
}

#[test]
fn failed_run_notifies_observer() {
    let observer = Arc::new(CollectingObserver::new());
    let source = VecSource::new(five_records()).failing_after(0);
    let sink = Arc::new(CollectingSink::new());
    let mut pipeline =
        Pipeline::new(source, sink, config(1)).with_observer(observer.clone());

    pipeline.run(None).unwrap_err();
    assert!(observer
        .events()
        .iter()
        .any(|event| matches!(event, ObserverEvent::RunFailed { .. })));
}

#[test]
fn finalize_runs_on_success_and_cleanup_closes_both_ends() {
    let sink = Arc::new(CollectingSink::new());
    let mut pipeline = Pipeline::new(VecSource::new(five_records()), sink.clone(), config(1));

    pipeline.run(None).unwrap();
    assert!(sink.was_finalized());
    assert!(!sink.was_closed());

    pipeline.cleanup().unwrap();
    assert!(sink.was_closed());
}

#[test]
fn memory_sink_parallel_run_keeps_every_record_once() {
    let mut records = Vec::new();
    for n in 0..50 {
        records.push(Record::new(format!("id-{n}"), "x"));
        records.push(Record::new(format!("id-{n}"), "y"));
    }

    let sink = Arc::new(MemorySink::new());
    let mut pipeline = Pipeline::new(VecSource::new(records), sink.clone(), config(8));

    let stats = pipeline.run(None).unwrap();
    assert_eq!(stats.inserted, 50);
    assert_eq!(stats.skipped, 50);
    assert_eq!(sink.len(), 50);
}
