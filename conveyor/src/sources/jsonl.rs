//! JSON Lines file source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::core::{Payload, QueryParams, Record};
use crate::errors::SourceError;
use crate::sources::{RecordStream, Source};

/// Reads one JSON document per line from a `.jsonl` file.
///
/// The record id comes from `id_field` when present, falling back to
/// `line_<n>`; the payload comes from `content_field` when present, falling
/// back to the whole document. Malformed lines are logged and skipped —
/// only I/O failures abort the stream.
#[derive(Debug)]
pub struct JsonlSource {
    path: PathBuf,
    id_field: String,
    content_field: String,
    records_read: u64,
}

fn extract_record(
    id_field: &str,
    content_field: &str,
    document: serde_json::Value,
    line_number: u64,
) -> Record {
    let id = document.get(id_field).map_or_else(
        || format!("line_{line_number}"),
        |value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    );

    let payload = document.get(content_field).cloned().unwrap_or(document);

    Record::new(id, Payload::Json(payload))
}

impl JsonlSource {
    /// Creates a source with the default `id`/`content` field names.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_fields(path, "id", "content")
    }

    /// Creates a source with explicit field names.
    #[must_use]
    pub fn with_fields(
        path: impl AsRef<Path>,
        id_field: impl Into<String>,
        content_field: impl Into<String>,
    ) -> Self {
        let source = Self {
            path: path.as_ref().to_path_buf(),
            id_field: id_field.into(),
            content_field: content_field.into(),
            records_read: 0,
        };
        info!(
            path = %source.path.display(),
            id_field = %source.id_field,
            content_field = %source.content_field,
            "jsonl source initialized"
        );
        source
    }
}

impl Source for JsonlSource {
    fn fetch(&mut self, params: Option<&QueryParams>) -> Result<RecordStream<'_>, SourceError> {
        let limit = params.and_then(|p| p.limit);
        info!(path = %self.path.display(), ?limit, "reading jsonl source");

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let id_field = &self.id_field;
        let content_field = &self.content_field;
        let records_read = &mut self.records_read;
        let mut emitted: u64 = 0;

        let stream = reader
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let line_number = index as u64 + 1;
                match line {
                    Err(err) => Some(Err(SourceError::Io(err))),
                    Ok(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            return None;
                        }
                        match serde_json::from_str::<serde_json::Value>(line) {
                            Ok(document) => Some(Ok((document, line_number))),
                            Err(err) => {
                                error!(line = line_number, %err, "invalid JSON line, skipping");
                                None
                            }
                        }
                    }
                }
            })
            .map_while(move |item| {
                if limit.is_some_and(|limit| emitted >= limit) {
                    return None;
                }
                emitted += 1;
                Some(item)
            })
            .map(move |item| {
                item.map(|(document, line_number)| {
                    *records_read += 1;
                    extract_record(id_field, content_field, document, line_number)
                })
            });

        Ok(Box::new(stream))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        info!(
            path = %self.path.display(),
            records_read = self.records_read,
            "jsonl source closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jsonl(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn collect(source: &mut JsonlSource, params: Option<&QueryParams>) -> Vec<Record> {
        source
            .fetch(params)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn reads_id_and_content_fields() {
        let file = write_jsonl(&[
            r#"{"id": "rec1", "content": {"name": "alice"}}"#,
            r#"{"id": "rec2", "content": {"name": "bob"}}"#,
        ]);
        let mut source = JsonlSource::new(file.path());

        let records = collect(&mut source, None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "rec1");
        assert_eq!(
            records[0].payload.as_json(),
            Some(&serde_json::json!({"name": "alice"}))
        );
    }

    #[test]
    fn falls_back_to_line_number_and_whole_document() {
        let file = write_jsonl(&[r#"{"name": "charlie"}"#]);
        let mut source = JsonlSource::new(file.path());

        let records = collect(&mut source, None);
        assert_eq!(records[0].id, "line_1");
        assert_eq!(
            records[0].payload.as_json(),
            Some(&serde_json::json!({"name": "charlie"}))
        );
    }

    #[test]
    fn skips_malformed_and_empty_lines() {
        let file = write_jsonl(&[
            r#"{"id": "rec1", "content": 1}"#,
            "not json at all",
            "",
            r#"{"id": "rec2", "content": 2}"#,
        ]);
        let mut source = JsonlSource::new(file.path());

        let records = collect(&mut source, None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "rec2");
    }

    #[test]
    fn honors_limit() {
        let file = write_jsonl(&[
            r#"{"id": "1", "content": 1}"#,
            r#"{"id": "2", "content": 2}"#,
            r#"{"id": "3", "content": 3}"#,
        ]);
        let mut source = JsonlSource::new(file.path());

        let params = QueryParams::new().with_limit(2);
        let records = collect(&mut source, Some(&params));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_file_is_fatal() {
        let mut source = JsonlSource::new("/nonexistent/input.jsonl");
        assert!(source.fetch(None).is_err());
    }
}
