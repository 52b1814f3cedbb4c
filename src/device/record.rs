//! Record parsing for the sonic3D line protocol
//!
//! Line format (semicolon separated, ASCII):
//!
//! ```text
//! 010000320000000000000000000000;-0.001;-0.036;0.012;23.602;0.036;1.525;...
//! └──────── status code ───────┘ └──U──┘ └──V──┘ └─W─┘ └──T─┘ └─ ignored ─┘
//! ```
//!
//! Field 0 is a device status code and is ignored, fields 1 through 4 are
//! the payload, anything after is ignored.

use crate::error::{Error, Result};

/// First payload position on the wire
const PAYLOAD_START: usize = 1;

/// Number of payload fields per line
const PAYLOAD_LEN: usize = 4;

/// Field separator
const SEPARATOR: char = ';';

/// Ordered mapping from protocol key to publish name
///
/// Order matches the wire order of payload fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    /// Build from `(key, publish_name)` pairs in wire order
    pub fn new<I, K, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, n)| (k.into(), n.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Protocol keys in wire order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Publish name for a protocol key
    pub fn publish_name(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, n)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n.as_str()))
    }
}

/// One parsed sample, keyed by protocol key in wire order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedRecord {
    values: Vec<(String, f64)>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; keys are expected to be unique
    pub fn push(&mut self, key: impl Into<String>, value: f64) {
        self.values.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Parse one framed line into a record keyed by `fields`
///
/// The whole record fails if any payload token is not a finite number; no
/// partial record is ever returned.
pub fn parse_record(line: &[u8], fields: &FieldMap) -> Result<ParsedRecord> {
    let text = std::str::from_utf8(line)
        .map_err(|e| Error::MalformedRecord(format!("invalid UTF-8: {}", e)))?
        .trim_end();

    let payload: Vec<&str> = text
        .split(SEPARATOR)
        .skip(PAYLOAD_START)
        .take(PAYLOAD_LEN)
        .collect();

    if payload.is_empty() || payload.len() < fields.len() {
        log::warn!("Empty or incomplete data line received: {:?}", text);
        return Err(Error::MalformedRecord(format!(
            "expected at least {} payload fields, got {}",
            fields.len(),
            payload.len()
        )));
    }

    // Convert every payload token before zipping, so a bad trailing token
    // spoils the record even when the map is shorter than the payload
    let mut values = Vec::with_capacity(payload.len());
    for (position, token) in payload.iter().enumerate() {
        let value = token
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::InvalidValue {
                key: fields
                    .keys()
                    .nth(position)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", position + PAYLOAD_START)),
                token: token.to_string(),
            })?;
        values.push(value);
    }

    let mut record = ParsedRecord::new();
    for (key, value) in fields.keys().zip(values) {
        record.push(key, value);
    }
    Ok(record)
}
