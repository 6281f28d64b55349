//! Diagnostic analyzers: pluggable error-to-suggestion hooks.
//!
//! An analyzer turns a per-record failure into an optional human-readable
//! troubleshooting message. It is strictly advisory: the engine surfaces the
//! suggestion as an informational log line and nothing else. Failures inside
//! an analyzer — errors or panics — are contained by [`DiagnosticRouter`]
//! and never affect the run's own error accounting.

mod rules;

#[cfg(feature = "claude")]
mod claude;

pub use rules::RuleBasedAnalyzer;

#[cfg(feature = "claude")]
pub use claude::{ClaudeAnalyzer, DEFAULT_CLAUDE_MODEL};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::errors::AnalyzerError;

/// Where and when a failure occurred, handed to the analyzer as context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Operation that failed (e.g. `"sink_insert"`).
    pub operation: String,
    /// Id of the record being processed, when applicable.
    pub record_id: Option<String>,
    /// Value of the monotonic processed counter at failure time.
    pub total_processed: u64,
}

impl ErrorContext {
    /// Creates a context for an operation.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            record_id: None,
            total_processed: 0,
        }
    }

    /// Sets the record id.
    #[must_use]
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Sets the processed-counter value.
    #[must_use]
    pub fn with_total_processed(mut self, total_processed: u64) -> Self {
        self.total_processed = total_processed;
        self
    }
}

/// Pluggable diagnostic hook.
///
/// `explain` receives the failure's display text plus context and returns an
/// optional suggestion. Returning `Ok(None)` means "no analysis available";
/// an `Err` is an analyzer-internal failure the engine will swallow.
pub trait ErrorAnalyzer: Send + Sync {
    /// Whether this analyzer will produce analyses at all.
    fn is_enabled(&self) -> bool;

    /// Analyzes a failure and returns troubleshooting text, if any.
    fn explain(
        &self,
        error: &str,
        context: &ErrorContext,
    ) -> Result<Option<String>, AnalyzerError>;
}

/// Analyzer that never produces analyses. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAnalyzer;

impl ErrorAnalyzer for NoOpAnalyzer {
    fn is_enabled(&self) -> bool {
        false
    }

    fn explain(
        &self,
        _error: &str,
        _context: &ErrorContext,
    ) -> Result<Option<String>, AnalyzerError> {
        Ok(None)
    }
}

/// Routes per-record failures to the log and the configured analyzer.
///
/// Shared by the inline path and every worker thread. The analyzer call is
/// wrapped in `catch_unwind`: a diagnostic hook that errors or panics must
/// never abort the run or skew its accounting.
#[derive(Clone)]
pub struct DiagnosticRouter {
    analyzer: Arc<dyn ErrorAnalyzer>,
}

impl DiagnosticRouter {
    /// Creates a router over an analyzer.
    #[must_use]
    pub fn new(analyzer: Arc<dyn ErrorAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Creates a router with analysis disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoOpAnalyzer))
    }

    /// Logs a failed insert and consults the analyzer.
    pub fn report(&self, error_text: &str, context: &ErrorContext) {
        error!(
            operation = %context.operation,
            record_id = context.record_id.as_deref().unwrap_or("<none>"),
            total_processed = context.total_processed,
            error = error_text,
            "record insert failed"
        );

        if !self.analyzer.is_enabled() {
            return;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.analyzer.explain(error_text, context)
        }));
        match outcome {
            Ok(Ok(Some(suggestion))) => {
                info!(
                    record_id = context.record_id.as_deref().unwrap_or("<none>"),
                    "\n{suggestion}\n"
                );
            }
            Ok(Ok(None)) => {}
            Ok(Err(analysis_error)) => {
                debug!(%analysis_error, "error analysis failed (non-critical)");
            }
            Err(_) => {
                debug!("error analyzer panicked (non-critical)");
            }
        }
    }
}

impl std::fmt::Debug for DiagnosticRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticRouter")
            .field("enabled", &self.analyzer.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingAnalyzer;

    impl ErrorAnalyzer for PanickingAnalyzer {
        fn is_enabled(&self) -> bool {
            true
        }

        fn explain(
            &self,
            _error: &str,
            _context: &ErrorContext,
        ) -> Result<Option<String>, AnalyzerError> {
            panic!("analyzer blew up");
        }
    }

    #[test]
    fn context_builder() {
        let context = ErrorContext::new("sink_insert")
            .with_record_id("r-3")
            .with_total_processed(17);

        assert_eq!(context.operation, "sink_insert");
        assert_eq!(context.record_id.as_deref(), Some("r-3"));
        assert_eq!(context.total_processed, 17);
    }

    #[test]
    fn noop_analyzer_is_disabled() {
        let analyzer = NoOpAnalyzer;
        assert!(!analyzer.is_enabled());
        assert_eq!(
            analyzer.explain("boom", &ErrorContext::new("op")).unwrap(),
            None
        );
    }

    #[test]
    fn router_contains_analyzer_panic() {
        let router = DiagnosticRouter::new(Arc::new(PanickingAnalyzer));
        // Must not propagate the panic.
        router.report("boom", &ErrorContext::new("sink_insert"));
    }

    #[test]
    fn disabled_router_skips_analysis() {
        let router = DiagnosticRouter::disabled();
        router.report("boom", &ErrorContext::new("sink_insert"));
    }
}
