//! Run statistics and the atomic counter cell behind thread-safe sinks.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::sinks::InsertOutcome;

/// Outcome counts for one pipeline run.
///
/// The sink is the source of truth for `inserted`/`skipped`; the engine
/// independently tracks `errors` for records whose insert failed. For a
/// completed run, `inserted + skipped + errors` equals the number of records
/// the source emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Records the sink accepted.
    pub inserted: u64,
    /// Records the sink reported as duplicates.
    pub skipped: u64,
    /// Records whose insert failed.
    pub errors: u64,
}

impl RunStats {
    /// Creates empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records accounted for.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inserted + self.skipped + self.errors
    }

    /// Adds another stats block into this one.
    pub fn merge(&mut self, other: &Self) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inserted={} skipped={} errors={}",
            self.inserted, self.skipped, self.errors
        )
    }
}

/// Lock-free outcome counters for sinks shared across worker threads.
///
/// Relaxed ordering is sufficient: counters are independent and only read
/// as a snapshot after the run's join point.
#[derive(Debug, Default)]
pub struct AtomicStats {
    inserted: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert outcome.
    pub fn record(&self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted.fetch_add(1, Ordering::Relaxed),
            InsertOutcome::Duplicate => self.skipped.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Records a failed insert.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads the current counts.
    #[must_use]
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            inserted: self.inserted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_all_outcomes() {
        let stats = RunStats {
            inserted: 3,
            skipped: 1,
            errors: 2,
        };
        assert_eq!(stats.total(), 6);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = RunStats {
            inserted: 1,
            skipped: 0,
            errors: 1,
        };
        let b = RunStats {
            inserted: 2,
            skipped: 3,
            errors: 0,
        };
        a.merge(&b);
        assert_eq!(
            a,
            RunStats {
                inserted: 3,
                skipped: 3,
                errors: 1
            }
        );
    }

    #[test]
    fn atomic_stats_snapshot() {
        let cell = AtomicStats::new();
        cell.record(InsertOutcome::Inserted);
        cell.record(InsertOutcome::Inserted);
        cell.record(InsertOutcome::Duplicate);
        cell.record_error();

        assert_eq!(
            cell.snapshot(),
            RunStats {
                inserted: 2,
                skipped: 1,
                errors: 1
            }
        );
    }

    #[test]
    fn display_format() {
        let stats = RunStats {
            inserted: 5,
            skipped: 2,
            errors: 0,
        };
        assert_eq!(stats.to_string(), "inserted=5 skipped=2 errors=0");
    }
}
