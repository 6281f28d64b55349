//! Source contract and the shipped source implementations.

mod csv;
mod jsonl;

#[cfg(feature = "elasticsearch")]
mod elasticsearch;

pub use self::csv::CsvSource;
pub use jsonl::JsonlSource;

#[cfg(feature = "elasticsearch")]
pub use elasticsearch::{ElasticsearchAuth, ElasticsearchConfig, ElasticsearchSource};

use crate::core::{QueryParams, Record};
use crate::errors::SourceError;

/// A lazily-produced, one-shot stream of records.
///
/// An `Err` item is an unrecoverable enumeration failure: the engine aborts
/// the run when it sees one. Sources must fail loudly this way rather than
/// silently stopping short.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record, SourceError>> + 'a>;

/// A producer of pipeline records.
pub trait Source: Send {
    /// Starts one pass over the source's records.
    ///
    /// Sources interpret only the [`QueryParams`] fields that apply to them
    /// and may legitimately produce zero records.
    fn fetch(&mut self, params: Option<&QueryParams>) -> Result<RecordStream<'_>, SourceError>;

    /// Releases source resources.
    fn close(&mut self) -> Result<(), SourceError>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn fetch(&mut self, params: Option<&QueryParams>) -> Result<RecordStream<'_>, SourceError> {
        (**self).fetch(params)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        (**self).close()
    }
}
