//! Sink contract and the shipped sink implementations.

mod jsonl;
mod memory;

pub use jsonl::{JsonlSink, RecordShape, WriteMode};
pub use memory::MemorySink;

use crate::core::{Payload, RunStats};
use crate::errors::SinkError;

/// Per-record result of a sink insert.
///
/// The Rust rendition of the insert boolean: `Inserted` means the sink
/// accepted the record, `Duplicate` means it was skipped as already seen.
/// Genuine I/O or validation failures are errors, not outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted,
    /// The record id was already accepted; the record was skipped.
    Duplicate,
}

impl InsertOutcome {
    /// Returns true for [`InsertOutcome::Inserted`].
    #[must_use]
    pub fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// A destination for pipeline records.
///
/// `insert` must not error for ordinary duplicate detection — that is what
/// [`InsertOutcome::Duplicate`] is for. It may error for genuine I/O or
/// validation failures, which the engine treats as recoverable per-record
/// errors.
///
/// # Thread safety
///
/// Under parallel execution the engine calls `insert` concurrently from
/// multiple worker threads. Duplicate detection backed by an in-memory
/// seen-id set is only correct if the sink performs the check-and-insert as
/// one atomic step (the shipped sinks do, via [`dashmap`]). This is a
/// contractual requirement on implementations, not something the engine
/// verifies.
pub trait Sink: Send + Sync {
    /// Inserts one record, reporting whether it was written or skipped as a
    /// duplicate.
    fn insert(&self, id: &str, payload: &Payload) -> Result<InsertOutcome, SinkError>;

    /// Flushes or commits pending work. Called once by the engine after the
    /// stream is drained; a failure here is fatal to the run.
    fn finalize(&self) -> Result<(), SinkError>;

    /// Releases sink resources. Safe to call once; double-close behavior is
    /// implementation-defined.
    fn close(&self) -> Result<(), SinkError>;

    /// Current outcome counts as tracked by the sink.
    ///
    /// The sink owns `inserted`/`skipped`; its `errors` field covers
    /// failures it absorbed internally, and the engine adds its own count
    /// of failed `insert` calls on top.
    fn stats(&self) -> RunStats;
}
