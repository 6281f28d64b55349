//! In-memory sink with first-write-wins deduplication.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{AtomicStats, Payload, RunStats};
use crate::errors::SinkError;
use crate::sinks::{InsertOutcome, Sink};

/// A sink that keeps records in memory.
///
/// Deduplication uses the map's entry API, so the seen-check and the write
/// are one atomic step and the sink is safe under parallel execution. Used
/// by tests, examples, and benchmarks.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: DashMap<String, Payload>,
    stats: AtomicStats,
    closed: AtomicBool,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct records accepted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no record has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the stored payload for an id, if present.
    #[must_use]
    pub fn payload_of(&self, id: &str) -> Option<Payload> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Returns all stored ids, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Sink for MemorySink {
    fn insert(&self, id: &str, payload: &Payload) -> Result<InsertOutcome, SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }

        let outcome = match self.records.entry(id.to_string()) {
            Entry::Occupied(_) => InsertOutcome::Duplicate,
            Entry::Vacant(slot) => {
                slot.insert(payload.clone());
                InsertOutcome::Inserted
            }
        };
        self.stats.record(outcome);
        Ok(outcome)
    }

    fn finalize(&self) -> Result<(), SinkError> {
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
