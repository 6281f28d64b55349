//! Rule-based analyzer: no API required.

use regex::RegexSet;

use crate::analyzer::{ErrorAnalyzer, ErrorContext};
use crate::errors::AnalyzerError;

/// Pattern-matched troubleshooting suggestions for common failures.
///
/// A fallback for when no AI backend is configured: matches the failure
/// text against a fixed pattern table and returns canned, prioritized
/// steps. Always enabled, never touches the network.
#[derive(Debug)]
pub struct RuleBasedAnalyzer {
    patterns: RegexSet,
}

/// Suggestion builders, index-aligned with the pattern set.
const SUGGESTIONS: &[fn(&ErrorContext) -> String] = &[
    connection_refused_help,
    timeout_help,
    permission_help,
    file_not_found_help,
    json_decode_help,
    missing_field_help,
    elasticsearch_help,
];

const PATTERNS: &[&str] = &[
    r"(?i)connection refused",
    r"(?i)timed? ?out",
    r"(?i)permission denied",
    r"(?i)no such file or directory|file not found",
    r"(?i)expected value|eof while parsing|invalid type|trailing characters",
    r"(?i)missing (field|column|key)",
    r"(?i)elasticsearch|scroll",
];

impl RuleBasedAnalyzer {
    /// Builds the analyzer with its pattern table.
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::expect_used)]
        let patterns = RegexSet::new(PATTERNS).expect("pattern table is statically valid");
        Self { patterns }
    }
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorAnalyzer for RuleBasedAnalyzer {
    fn is_enabled(&self) -> bool {
        true
    }

    fn explain(
        &self,
        error: &str,
        context: &ErrorContext,
    ) -> Result<Option<String>, AnalyzerError> {
        let suggestion = self
            .patterns
            .matches(error)
            .iter()
            .next()
            .map_or_else(|| generic_help(error, context), |idx| SUGGESTIONS[idx](context));
        Ok(Some(suggestion))
    }
}

fn connection_refused_help(context: &ErrorContext) -> String {
    format!(
        "Troubleshooting: connection refused\n\
         \n\
         1. Check if the target service is running\n\
         2. Verify the host and port are correct\n\
         3. Check firewall rules blocking the connection\n\
         4. If using 'localhost', try '127.0.0.1' or vice versa\n\
         \n\
         Operation: {}",
        context.operation
    )
}

fn timeout_help(_context: &ErrorContext) -> String {
    "Troubleshooting: timeout\n\
     \n\
     1. Check network connectivity to the service\n\
     2. The service may be overloaded; check system resources\n\
     3. Increase the timeout value in configuration\n\
     4. Look for slow queries or operations"
        .to_string()
}

fn permission_help(_context: &ErrorContext) -> String {
    "Troubleshooting: permission denied\n\
     \n\
     1. Check file/directory permissions: ls -la\n\
     2. Verify the process runs under the intended user account\n\
     3. For files: chmod/chown to fix permissions"
        .to_string()
}

fn file_not_found_help(_context: &ErrorContext) -> String {
    "Troubleshooting: file not found\n\
     \n\
     1. Verify the file path (absolute vs relative)\n\
     2. Check the file exists: ls -la <filepath>\n\
     3. Verify the working directory: pwd\n\
     4. Check for typos in the filename"
        .to_string()
}

fn json_decode_help(_context: &ErrorContext) -> String {
    "Troubleshooting: JSON decode error\n\
     \n\
     1. Check the content is valid JSON; it might be an HTML error page\n\
     2. Verify the API returns the expected format\n\
     3. Check for empty responses"
        .to_string()
}

fn missing_field_help(_context: &ErrorContext) -> String {
    "Troubleshooting: missing field\n\
     \n\
     1. Check the data structure matches the expected format\n\
     2. Verify column/field names match the source configuration\n\
     3. The data source may have changed schema"
        .to_string()
}

fn elasticsearch_help(_context: &ErrorContext) -> String {
    "Troubleshooting: Elasticsearch error\n\
     \n\
     1. Verify Elasticsearch is reachable: curl <host>:9200\n\
     2. Check authentication credentials\n\
     3. Verify the index name exists\n\
     4. Check Elasticsearch logs for details"
        .to_string()
}

fn generic_help(error: &str, _context: &ErrorContext) -> String {
    format!(
        "Troubleshooting: {error}\n\
         \n\
         1. Check the error message above for specific details\n\
         2. Review configuration settings\n\
         3. Verify all required services are running"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain(error: &str) -> String {
        RuleBasedAnalyzer::new()
            .explain(error, &ErrorContext::new("sink_insert"))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn always_enabled() {
        assert!(RuleBasedAnalyzer::new().is_enabled());
    }

    #[test]
    fn matches_connection_refused() {
        let text = explain("sink I/O error: Connection refused (os error 111)");
        assert!(text.contains("connection refused"));
        assert!(text.contains("sink_insert"));
    }

    #[test]
    fn matches_json_decode() {
        let text = explain("expected value at line 1 column 1");
        assert!(text.contains("JSON decode"));
    }

    #[test]
    fn matches_timeout_variants() {
        assert!(explain("operation timed out").contains("timeout"));
        assert!(explain("request timeout").contains("timeout"));
    }

    #[test]
    fn unknown_error_gets_generic_help() {
        let text = explain("some entirely novel failure");
        assert!(text.contains("some entirely novel failure"));
        assert!(text.contains("Review configuration settings"));
    }
}
