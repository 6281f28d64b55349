//! CSV file source.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::{Payload, QueryParams, Record};
use crate::errors::SourceError;
use crate::sources::{RecordStream, Source};

/// Reads records from a header-driven CSV file.
///
/// The id comes from `id_column`; rows with an empty id are logged and
/// skipped. If the `content_column` cell holds valid JSON it becomes the
/// payload, otherwise the entire row is converted to a JSON object.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    id_column: String,
    content_column: String,
    records_read: u64,
}

impl CsvSource {
    /// Creates a source with the default `id`/`content` column names.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_columns(path, "id", "content")
    }

    /// Creates a source with explicit column names.
    #[must_use]
    pub fn with_columns(
        path: impl AsRef<Path>,
        id_column: impl Into<String>,
        content_column: impl Into<String>,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            id_column: id_column.into(),
            content_column: content_column.into(),
            records_read: 0,
        }
    }
}

fn row_to_payload(headers: &csv::StringRecord, row: &csv::StringRecord, content_idx: Option<usize>) -> Payload {
    if let Some(idx) = content_idx {
        if let Some(cell) = row.get(idx) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(cell) {
                return Payload::Json(value);
            }
        }
    }

    // Fall back to the whole row as a JSON object.
    let object: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .zip(row.iter())
        .map(|(header, cell)| {
            (
                header.to_string(),
                serde_json::Value::String(cell.to_string()),
            )
        })
        .collect();
    Payload::Json(serde_json::Value::Object(object))
}

impl Source for CsvSource {
    fn fetch(&mut self, params: Option<&QueryParams>) -> Result<RecordStream<'_>, SourceError> {
        let limit = params.and_then(|p| p.limit);
        info!(path = %self.path.display(), ?limit, "reading csv source");

        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();

        let id_idx = headers
            .iter()
            .position(|header| header == self.id_column)
            .ok_or_else(|| {
                SourceError::Configuration(format!(
                    "CSV file {} has no '{}' column",
                    self.path.display(),
                    self.id_column
                ))
            })?;
        let content_idx = headers
            .iter()
            .position(|header| header == self.content_column);

        let records_read = &mut self.records_read;
        let mut emitted: u64 = 0;

        let stream = reader
            .into_records()
            .enumerate()
            .filter_map(move |(index, row)| {
                let row_number = index as u64 + 1;
                match row {
                    Err(err) => Some(Err(SourceError::Parse {
                        position: row_number,
                        message: err.to_string(),
                    })),
                    Ok(row) => {
                        let id = row.get(id_idx).unwrap_or_default();
                        if id.is_empty() {
                            warn!(row = row_number, "row missing id value, skipping");
                            return None;
                        }
                        let payload = row_to_payload(&headers, &row, content_idx);
                        Some(Ok(Record::new(id, payload)))
                    }
                }
            })
            .map_while(move |item| {
                if limit.is_some_and(|limit| emitted >= limit) {
                    return None;
                }
                emitted += 1;
                if item.is_ok() {
                    *records_read += 1;
                }
                Some(item)
            });

        Ok(Box::new(stream))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        info!(
            path = %self.path.display(),
            records_read = self.records_read,
            "csv source closed"
        );
        Ok(())
    }
}

fn csv_error(err: csv::Error) -> SourceError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io_err) => SourceError::Io(io_err),
            other => SourceError::Parse {
                position: 0,
                message: format!("{other:?}"),
            },
        }
    } else {
        SourceError::Parse {
            position: 0,
            message: err.to_string(),
        }
    }
}
