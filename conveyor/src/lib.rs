//! # Conveyor
//!
//! A source-to-sink record pipeline with parallel insertion and failure
//! isolation.
//!
//! Conveyor moves records from a pluggable [`Source`] to a pluggable
//! [`Sink`], tracking per-record outcomes (inserted, duplicate-skipped,
//! errored) and optionally fanning insertion out across worker threads:
//!
//! - **Dispatch engine**: inline execution for order-sensitive sinks, or a
//!   bounded-queue worker pool for thread-safe ones
//! - **Failure isolation**: a broken record never stops the run; a broken
//!   source always does
//! - **Diagnostics**: pluggable analyzers turn failures into troubleshooting
//!   suggestions without affecting control flow
//! - **Observability**: injectable observers and an atomic metrics registry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conveyor::prelude::*;
//!
//! let source = JsonlSource::new("input.jsonl");
//! let sink = Arc::new(JsonlSink::create("output.jsonl")?);
//! let config = PipelineConfig::new().with_workers(4);
//!
//! let mut pipeline = Pipeline::new(source, sink, config);
//! let stats = pipeline.run(None)?;
//! pipeline.cleanup()?;
//! ```
//!
//! [`Source`]: sources::Source
//! [`Sink`]: sinks::Sink

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analyzer;
pub mod cancellation;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analyzer::{
        DiagnosticRouter, ErrorAnalyzer, ErrorContext, NoOpAnalyzer, RuleBasedAnalyzer,
    };
    pub use crate::cancellation::CancellationToken;
    pub use crate::core::{AtomicStats, Payload, QueryParams, Record, RunStats};
    pub use crate::errors::{AnalyzerError, PipelineError, SinkError, SourceError};
    pub use crate::observability::{
        CollectingObserver, MetricsRegistry, MetricsSnapshot, NoOpObserver, PipelineObserver,
        TracingObserver,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, ProgressCounter};
    pub use crate::sinks::{InsertOutcome, JsonlSink, MemorySink, RecordShape, Sink, WriteMode};
    pub use crate::sources::{CsvSource, JsonlSource, Source};

    #[cfg(feature = "claude")]
    pub use crate::analyzer::ClaudeAnalyzer;

    #[cfg(feature = "elasticsearch")]
    pub use crate::sources::{ElasticsearchAuth, ElasticsearchConfig, ElasticsearchSource};
}
