//! Recovery of the stats document embedded in a replay artifact.
//!
//! Replay files carry a JSON metadata block whose string values were
//! backslash-escaped wholesale and whose arrays were wrapped in quotes. The
//! block is recovered with a fixed textual repair:
//!
//! 1. decode the artifact as UTF-8 (invalid sequences become U+FFFD),
//! 2. slice from the first [`START_MARKER`] to just past the last [`END_MARKER`],
//! 3. drop every `\`, then rewrite `"[` to `[` and `]"` to `]`,
//! 4. parse the first JSON value of the repaired slice.
//!
//! Previously stored content hashes depend on this exact sequence.

use serde_json::{Deserializer, Value};
use thiserror::Error;

/// First occurrence marks the start of the metadata object
pub const START_MARKER: &str = r#"{"gameLength":"#;

/// Last occurrence marks the end of the metadata object
pub const END_MARKER: &str = r#""}"#;

/// Field of the metadata object holding the stats payload
pub const STATS_FIELD: &str = "statsJson";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Marker {0} not found in artifact")]
    MissingMarker(&'static str),

    #[error("End marker precedes start marker")]
    InvertedBounds,

    #[error("Repaired metadata is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Metadata has no {STATS_FIELD} field")]
    MissingStats,
}

/// Stats payload together with the serialized form that is hashed
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPayload {
    pub value: Value,
    pub canonical: String,
}

/// Apply the repair rewrites to a metadata slice
pub fn repair(slice: &str) -> String {
    slice
        .replace('\\', "")
        .replace("\"[", "[")
        .replace("]\"", "]")
}

pub fn extract(bytes: &[u8]) -> Result<ExtractedPayload, ExtractError> {
    let text = String::from_utf8_lossy(bytes);

    let start = text
        .find(START_MARKER)
        .ok_or(ExtractError::MissingMarker(START_MARKER))?;
    let end = text
        .rfind(END_MARKER)
        .ok_or(ExtractError::MissingMarker(END_MARKER))?
        + END_MARKER.len();
    if end <= start {
        return Err(ExtractError::InvertedBounds);
    }

    let repaired = repair(&text[start..end]);

    // Anything after the first complete value is ignored.
    let mut values = Deserializer::from_str(&repaired).into_iter::<Value>();
    let root = match values.next() {
        Some(value) => value?,
        None => return Err(ExtractError::MissingStats),
    };

    let value = match root {
        Value::Object(mut fields) => fields.remove(STATS_FIELD).ok_or(ExtractError::MissingStats)?,
        _ => return Err(ExtractError::MissingStats),
    };
    let canonical = serde_json::to_string(&value)?;

    Ok(ExtractedPayload { value, canonical })
}
