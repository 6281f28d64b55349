//! Record and payload types.
//!
//! The engine treats payloads as opaque: it never inspects their shape.
//! Serialization decisions belong to sinks, which render a [`Payload`]
//! however their output format requires.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// An opaque record payload.
///
/// A tagged union of the shapes sources actually produce: structured JSON,
/// plain text, or raw bytes. Sinks choose their own rendering; the only
/// shared convention is that [`Payload::to_json_value`] encodes bytes as
/// base64 so every payload has a JSON representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A structured JSON document.
    Json(serde_json::Value),
    /// Plain text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Payload {
    /// Returns the JSON document, if this payload is structured.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text, if this payload is plain text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Renders the payload as a JSON value.
    ///
    /// Text stays a JSON string; bytes become a base64 string.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Text(text) => serde_json::Value::String(text.clone()),
            Self::Bytes(bytes) => serde_json::Value::String(BASE64.encode(bytes)),
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A single record moving through the pipeline.
///
/// `id` is caller-supplied and must be unique within a run for sink
/// deduplication to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Caller-supplied record identifier.
    pub id: String,
    /// Opaque payload, passed through unparsed by the engine.
    pub payload: Payload,
}

impl Record {
    /// Creates a record from an id and any payload-convertible value.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}
