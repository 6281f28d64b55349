//! Test doubles for sources, sinks, and analyzers.
//!
//! Used by this crate's own tests and available to downstream crates that
//! want to exercise pipelines without real I/O.

use dashmap::DashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::analyzer::{ErrorAnalyzer, ErrorContext};
use crate::core::{AtomicStats, Payload, QueryParams, Record, RunStats};
use crate::errors::{AnalyzerError, SinkError, SourceError};
use crate::sinks::{InsertOutcome, Sink};
use crate::sources::{RecordStream, Source};

/// A source backed by an in-memory list of records.
///
/// Re-iterable: each `fetch` replays the full list. Query parameters are
/// ignored. Can be configured to fail mid-stream after yielding a fixed
/// number of records.
#[derive(Debug, Clone)]
pub struct VecSource {
    records: Vec<Record>,
    fail_after: Option<usize>,
    closed: bool,
}

impl VecSource {
    /// Creates a source over the given records.
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            fail_after: None,
            closed: false,
        }
    }

    /// Convenience constructor from `(id, text payload)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(id, content)| Record::new(*id, *content))
                .collect(),
        )
    }

    /// Makes the stream fail after yielding `yield_count` records.
    #[must_use]
    pub fn failing_after(mut self, yield_count: usize) -> Self {
        self.fail_after = Some(yield_count);
        self
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Source for VecSource {
    fn fetch(&mut self, _params: Option<&QueryParams>) -> Result<RecordStream<'_>, SourceError> {
        let records = self.records.clone();
        let fail_after = self.fail_after;
        let cutoff = fail_after.map_or(records.len(), |n| n.min(records.len()) + 1);

        let stream = records
            .into_iter()
            .enumerate()
            .take(cutoff)
            .map(move |(index, record)| {
                if fail_after.is_some_and(|n| index >= n) {
                    Err(SourceError::Configuration(
                        "synthetic source failure".to_string(),
                    ))
                } else {
                    Ok(record)
                }
            });
        Ok(Box::new(stream))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.closed = true;
        Ok(())
    }
}

/// A dedup-aware sink that collects accepted records in memory.
///
/// Insertion order is preserved; dedup is atomic (safe under parallel
/// execution); specific ids can be configured to fail their insert.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<(String, Payload)>>,
    seen: DashSet<String>,
    fail_on: DashSet<String>,
    stats: AtomicStats,
    finalized: AtomicBool,
    closed: AtomicBool,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes inserts for `id` fail with a validation error.
    #[must_use]
    pub fn with_failure_on(self, id: impl Into<String>) -> Self {
        self.fail_on.insert(id.into());
        self
    }

    /// Accepted `(id, payload)` pairs, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<(String, Payload)> {
        self.records.lock().clone()
    }

    /// Accepted ids, in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.records.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    /// First-write payload for an id, if accepted.
    #[must_use]
    pub fn payload_of(&self, id: &str) -> Option<Payload> {
        self.records
            .lock()
            .iter()
            .find(|(record_id, _)| record_id == id)
            .map(|(_, payload)| payload.clone())
    }

    /// Whether `finalize` has been called.
    #[must_use]
    pub fn was_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Sink for CollectingSink {
    fn insert(&self, id: &str, payload: &Payload) -> Result<InsertOutcome, SinkError> {
        if self.fail_on.contains(id) {
            return Err(SinkError::Validation {
                record_id: id.to_string(),
                message: "synthetic insert failure".to_string(),
            });
        }

        if !self.seen.insert(id.to_string()) {
            self.stats.record(InsertOutcome::Duplicate);
            return Ok(InsertOutcome::Duplicate);
        }

        self.records.lock().push((id.to_string(), payload.clone()));
        self.stats.record(InsertOutcome::Inserted);
        Ok(InsertOutcome::Inserted)
    }

    fn finalize(&self) -> Result<(), SinkError> {
        self.finalized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> RunStats {
        self.stats.snapshot()
    }
}

/// An analyzer whose `explain` always errors. Counts its invocations.
#[derive(Debug, Default)]
pub struct FailingAnalyzer {
    calls: AtomicU64,
}

impl FailingAnalyzer {
    /// Creates the analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `explain` calls so far.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ErrorAnalyzer for FailingAnalyzer {
    fn is_enabled(&self) -> bool {
        true
    }

    fn explain(
        &self,
        _error: &str,
        _context: &ErrorContext,
    ) -> Result<Option<String>, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AnalyzerError::Http("synthetic analyzer failure".to_string()))
    }
}

/// An analyzer whose `explain` always panics.
#[derive(Debug, Default)]
pub struct PanickingAnalyzer;

impl ErrorAnalyzer for PanickingAnalyzer {
    fn is_enabled(&self) -> bool {
        true
    }

    fn explain(
        &self,
        _error: &str,
        _context: &ErrorContext,
    ) -> Result<Option<String>, AnalyzerError> {
        panic!("synthetic analyzer panic");
    }
}
