//! Publishing parsed records to a telemetry sink
//!
//! Every field of a record becomes its own publish call:
//!
//! ```text
//! record {U: -0.001, V: -0.036, ...}
//!   → publish("sonic3d.uwind", -0.001, {missing, units, description, name, sensor}, ts)
//!   → publish("sonic3d.vwind", -0.036, {...}, ts)
//!   ...
//! ```
//!
//! One timestamp is taken per record so all fields of one physical sample
//! line up. The `status` name carries connection state (`connected`,
//! `NoData`) and verbatim error text.

mod metadata;
pub mod sink;

pub use metadata::SensorMetadata;
pub use sink::{JsonLineSink, MemorySink, Sink, UdpSink};

use crate::device::{FieldMap, ParsedRecord};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Publish name used for connection and error state
pub const STATUS: &str = "status";

/// Value advertised for missing samples
pub const MISSING_VALUE: &str = "-9999.0";

/// Per-publish metadata
pub type Meta = BTreeMap<String, String>;

/// A published value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One publish call as emitted by the concrete sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    pub value: Value,
    pub meta: Meta,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
}

/// Current time in nanoseconds since the Unix epoch
pub fn timestamp_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Publish every mapped field of `record`
///
/// Returns the number of field publishes. An empty record yields a single
/// `NoData` status publish. A field whose unit or description is missing is
/// reported on `status` and skipped; the other fields still go out.
/// `additional` entries override the generated metadata.
pub fn publish_record<S: Sink + ?Sized>(
    sink: &mut S,
    record: &ParsedRecord,
    fields: &FieldMap,
    metadata: &SensorMetadata,
    additional: Option<&Meta>,
) -> Result<usize> {
    let timestamp = timestamp_ns();

    if record.is_empty() {
        log::warn!("No data to publish.");
        let meta = Meta::from([("timestamp".to_string(), timestamp.to_string())]);
        sink.publish(STATUS, "NoData".into(), &meta, timestamp)?;
        return Ok(0);
    }

    let mut published = 0;
    for (key, value) in record.iter() {
        let Some(name) = fields.publish_name(key) else {
            continue;
        };

        match field_meta(name, metadata) {
            Ok(mut meta) => {
                if let Some(extra) = additional {
                    meta.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                sink.publish(name, value.into(), &meta, timestamp)?;
                published += 1;
            }
            Err(e) => {
                log::error!("Error: Missing key in meta data - {}", e);
                sink.publish(STATUS, e.to_string().into(), &Meta::new(), timestamp)?;
            }
        }
    }

    Ok(published)
}

/// Best-effort status publish; a failing sink is only logged
pub fn publish_status<S: Sink + ?Sized>(sink: &mut S, text: &str) {
    if let Err(e) = sink.publish(STATUS, text.into(), &Meta::new(), timestamp_ns()) {
        log::error!("Failed to publish status {:?}: {}", text, e);
    }
}

fn field_meta(name: &str, metadata: &SensorMetadata) -> Result<Meta> {
    Ok(Meta::from([
        ("missing".to_string(), MISSING_VALUE.to_string()),
        ("units".to_string(), metadata.unit(name)?.to_string()),
        (
            "description".to_string(),
            metadata.description(name)?.to_string(),
        ),
        ("name".to_string(), name.to_string()),
        ("sensor".to_string(), metadata.sensor().to_string()),
    ]))
}
