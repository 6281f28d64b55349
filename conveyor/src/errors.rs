//! Error types for the conveyor pipeline.
//!
//! Each subsystem owns its error enum; only [`PipelineError`] crosses the
//! `Pipeline::run` boundary. Per-record sink failures are folded into run
//! statistics rather than propagated.

use thiserror::Error;

/// Errors raised while enumerating records from a source.
///
/// Any `SourceError` surfaced through a record stream is fatal: a broken
/// source aborts the run, a broken single insert does not.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O failure while reading from the source.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP request to a remote source failed or returned a non-success
    /// status.
    #[error("source HTTP error (status {status}): {message}")]
    Http {
        /// HTTP status code, or 0 when the request never completed.
        status: u16,
        /// Response body or transport error description.
        message: String,
    },

    /// The source payload could not be decoded.
    #[error("source parse error at record {position}: {message}")]
    Parse {
        /// Position (line or row number) of the offending record.
        position: u64,
        /// Decoder error description.
        message: String,
    },

    /// The source was constructed or queried with invalid configuration.
    #[error("source configuration error: {0}")]
    Configuration(String),
}

/// Errors raised by a sink.
///
/// An `insert` error is recoverable per-record; `finalize`/`close` errors
/// are fatal.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying I/O failure while writing.
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record payload could not be serialized for this sink.
    #[error("sink serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink was used after `close`.
    #[error("sink is closed")]
    Closed,

    /// The record was rejected by sink-side validation.
    #[error("sink validation error for record '{record_id}': {message}")]
    Validation {
        /// Id of the rejected record.
        record_id: String,
        /// Why the sink rejected it.
        message: String,
    },
}

/// Errors raised inside a diagnostic analyzer.
///
/// The engine swallows these: diagnostic failures must never abort or skew a
/// run's own error accounting.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The analyzer is not enabled (e.g. no API key configured).
    #[error("analyzer is disabled")]
    Disabled,

    /// The analysis request could not be sent or completed.
    #[error("analyzer HTTP error: {0}")]
    Http(String),

    /// The analysis backend answered with an error.
    #[error("analyzer API error (status {status}): {message}")]
    Api {
        /// HTTP status code of the rejection.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The analysis backend answered with an unusable response shape.
    #[error("analyzer response missing content")]
    MissingContent,
}

/// The only error type that escapes [`Pipeline::run`].
///
/// [`Pipeline::run`]: crate::pipeline::Pipeline::run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fatal source enumeration failure.
    #[error("{0}")]
    Source(#[from] SourceError),

    /// Fatal sink failure outside the per-record insert path
    /// (`finalize`/`close`).
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// The run was cancelled through its cancellation token.
    #[error("pipeline cancelled: {reason}")]
    Cancelled {
        /// First cancellation reason recorded on the token.
        reason: String,
    },

    /// A worker thread panicked. Records in flight on that worker are lost
    /// from the accounting.
    #[error("worker thread '{worker}' panicked")]
    WorkerPanicked {
        /// Thread name of the dead worker.
        worker: String,
    },

    /// Failure while standing up the worker pool itself.
    #[error("pipeline I/O error: {0}")]
    Io(#[from] std::io::Error),
}
