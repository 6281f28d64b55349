//! JSON Lines file sink.

use dashmap::DashSet;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::{AtomicStats, Payload, RunStats};
use crate::errors::SinkError;
use crate::sinks::{InsertOutcome, Sink};

/// How the output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate any existing file.
    #[default]
    Overwrite,
    /// Append to an existing file.
    Append,
}

/// How each record is laid out on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordShape {
    /// `{"id": …, "content": …}` — the payload nested under a fixed key.
    #[default]
    Wrapped,
    /// The id merged into an object payload; non-object payloads land under
    /// a `"raw"` key.
    Flat,
}

/// A sink that writes one JSON document per line.
///
/// Duplicate ids are skipped via an atomic seen-id set, so the sink is safe
/// under parallel execution; line order across ids is then unordered.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    seen: DashSet<String>,
    stats: AtomicStats,
    shape: RecordShape,
}

impl JsonlSink {
    /// Opens a sink in overwrite mode with the wrapped record shape.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Self::with_options(path, WriteMode::Overwrite, RecordShape::Wrapped)
    }

    /// Opens a sink with explicit mode and record shape.
    pub fn with_options(
        path: impl AsRef<Path>,
        mode: WriteMode,
        shape: RecordShape,
    ) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            WriteMode::Overwrite => File::create(&path)?,
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(&path)?,
        };
        info!(path = %path.display(), ?mode, ?shape, "jsonl sink opened");

        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
            seen: DashSet::new(),
            stats: AtomicStats::new(),
            shape,
        })
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render_line(&self, id: &str, payload: &Payload) -> Result<String, SinkError> {
        let value = match self.shape {
            RecordShape::Wrapped => serde_json::json!({
                "id": id,
                "content": payload.to_json_value(),
            }),
            RecordShape::Flat => match payload.to_json_value() {
                serde_json::Value::Object(fields) => {
                    let mut merged = serde_json::Map::new();
                    merged.insert("id".to_string(), serde_json::Value::String(id.to_string()));
                    merged.extend(fields);
                    serde_json::Value::Object(merged)
                }
                other => serde_json::json!({ "id": id, "raw": other }),
            },
        };
        Ok(serde_json::to_string(&value)?)
    }
}

impl Sink for JsonlSink {
    fn insert(&self, id: &str, payload: &Payload) -> Result<InsertOutcome, SinkError> {
        // Atomic claim of the id; released below if the write fails.
        if !self.seen.insert(id.to_string()) {
            self.stats.record(InsertOutcome::Duplicate);
            debug!(record_id = id, "skipping duplicate id");
            return Ok(InsertOutcome::Duplicate);
        }

        let line = match self.render_line(id, payload) {
            Ok(line) => line,
            Err(err) => {
                self.seen.remove(id);
                return Err(err);
            }
        };

        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;
        if let Err(err) = writeln!(writer, "{line}") {
            drop(guard);
            self.seen.remove(id);
            return Err(err.into());
        }
        drop(guard);

        self.stats.record(InsertOutcome::Inserted);
        let inserted = self.stats.snapshot().inserted;
        if inserted % 100 == 0 {
            debug!(path = %self.path.display(), inserted, "jsonl sink progress");
        }
        Ok(InsertOutcome::Inserted)
    }

    fn finalize(&self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.lock().as_mut() {
            writer.flush()?;
        }
        debug!(path = %self.path.display(), stats = %self.stats.snapshot(), "jsonl sink finalized");
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        let mut guard = self.writer.lock();
        if let Some(mut writer) = guard.take() {
            writer.flush()?;
            info!(path = %self.path.display(), stats = %self.stats.snapshot(), "jsonl sink closed");
        }
        Ok(())
    }

    fn stats(&self) -> RunStats {
        self.stats.snapshot()
    }
}
