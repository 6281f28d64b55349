//! Monotonic processed-record counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cloneable handle over the run's total-processed counter.
///
/// Monotonic and inclusive of skipped and errored records. Readable from
/// any thread while a run is in flight, for progress reporting.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    total: Arc<AtomicU64>,
}

impl ProgressCounter {
    /// Creates a zeroed counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment(&self) -> u64 {
        self.total.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current count.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_are_visible_through_clones() {
        let counter = ProgressCounter::new();
        let view = counter.clone();

        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(view.get(), 2);
    }
}
