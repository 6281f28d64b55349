//! Query parameters passed through to sources.

use serde::{Deserialize, Serialize};

/// Parameters a caller hands to [`Source::fetch`].
///
/// Sources interpret only the fields that apply to them: file sources honor
/// `limit`, the Elasticsearch source builds its query from `match_all` or
/// the `gte`/`lte` time bounds.
///
/// [`Source::fetch`]: crate::sources::Source::fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Select every record, ignoring time bounds.
    #[serde(default)]
    pub match_all: bool,
    /// Inclusive lower time bound (source-defined format).
    #[serde(default)]
    pub gte: Option<String>,
    /// Inclusive upper time bound (source-defined format).
    #[serde(default)]
    pub lte: Option<String>,
    /// Stop after this many records.
    #[serde(default)]
    pub limit: Option<u64>,
}

impl QueryParams {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every record.
    #[must_use]
    pub fn with_match_all(mut self) -> Self {
        self.match_all = true;
        self
    }

    /// Sets the lower time bound.
    #[must_use]
    pub fn with_gte(mut self, gte: impl Into<String>) -> Self {
        self.gte = Some(gte.into());
        self
    }

    /// Sets the upper time bound.
    #[must_use]
    pub fn with_lte(mut self, lte: impl Into<String>) -> Self {
        self.lte = Some(lte.into());
        self
    }

    /// Caps the number of records fetched.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let params = QueryParams::new()
            .with_gte("2024-01-01")
            .with_lte("2024-02-01")
            .with_limit(100);

        assert!(!params.match_all);
        assert_eq!(params.gte.as_deref(), Some("2024-01-01"));
        assert_eq!(params.lte.as_deref(), Some("2024-02-01"));
        assert_eq!(params.limit, Some(100));
    }

    #[test]
    fn default_is_empty() {
        let params = QueryParams::default();
        assert_eq!(params, QueryParams::new());
        assert!(params.limit.is_none());
    }
}
