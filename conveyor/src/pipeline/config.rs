//! Pipeline configuration.

use serde::{Deserialize, Serialize};

fn default_worker_count() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_pipeline_id() -> String {
    "default".to_string()
}

/// Immutable per-run settings for a [`Pipeline`].
///
/// `worker_count == 1` selects inline execution on the calling thread;
/// anything higher selects the worker pool. `queue_capacity` bounds the
/// work queue in parallel mode, so a fast source blocks instead of running
/// arbitrarily far ahead of slow workers.
///
/// [`Pipeline`]: crate::pipeline::Pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of worker threads (minimum 1).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Bounded queue capacity for parallel mode (minimum 1).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Identifier carried in logs and observer events.
    #[serde(default = "default_pipeline_id")]
    pub pipeline_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            pipeline_id: default_pipeline_id(),
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration (inline mode).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker count, clamped to at least 1.
    #[must_use]
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    /// Sets the queue capacity, clamped to at least 1.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }

    /// Sets the pipeline id.
    #[must_use]
    pub fn with_pipeline_id(mut self, pipeline_id: impl Into<String>) -> Self {
        self.pipeline_id = pipeline_id.into();
        self
    }

    /// Whether this configuration selects inline execution.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.worker_count == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_inline_mode() {
        let config = PipelineConfig::default();
        assert!(config.is_inline());
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.pipeline_id, "default");
    }

    #[test]
    fn worker_and_capacity_floors() {
        let config = PipelineConfig::new().with_workers(0).with_queue_capacity(0);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn builder_chain() {
        let config = PipelineConfig::new()
            .with_workers(8)
            .with_queue_capacity(64)
            .with_pipeline_id("nightly-sync");

        assert!(!config.is_inline());
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.pipeline_id, "nightly-sync");
    }
}
