//! Stream batch decoding.
//!
//! A stream invocation delivers a batch of records, each carrying a base64
//! payload that decodes to a JSON envelope with a `message` field (the raw
//! access log line) plus passthrough metadata. Decoding is per record: one bad
//! payload never affects its neighbours.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error_handling::DecodeError;

/// A batch as delivered by the stream trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KinesisStreamEvent {
    /// Records in delivery order
    #[serde(rename = "Records", default)]
    pub records: Vec<KinesisStreamRecord>,
}

/// One record of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KinesisStreamRecord {
    /// Stream payload
    pub kinesis: KinesisRecordPayload,
    /// Event identifier assigned by the trigger
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// ARN of the source stream
    #[serde(
        rename = "eventSourceARN",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_source_arn: Option<String>,
}

/// Stream-specific part of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KinesisRecordPayload {
    /// Position of the record within its shard
    pub sequence_number: String,
    /// Partition key chosen by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    /// Base64-encoded JSON envelope
    pub data: String,
}

impl KinesisStreamRecord {
    /// Builds a record around an envelope, base64-encoding it the way the
    /// stream delivers it.
    pub fn from_envelope(sequence_number: impl Into<String>, envelope: &Value) -> Self {
        let data = base64::engine::general_purpose::STANDARD.encode(envelope.to_string());
        KinesisStreamRecord {
            kinesis: KinesisRecordPayload {
                sequence_number: sequence_number.into(),
                partition_key: None,
                data,
            },
            event_id: None,
            event_source_arn: None,
        }
    }
}

/// Decoded payload of one stream record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLogEvent {
    /// Source sequence number, for tracing only
    pub sequence_number: String,
    /// Raw access log line
    pub message: String,
    /// Every other envelope field, preserved verbatim
    pub envelope: Map<String, Value>,
}

impl RawLogEvent {
    /// Looks up a passthrough field by dotted path, accepting both nested
    /// (`{"host":{"hostname":..}}`) and flat (`{"host.hostname":..}`) forms.
    pub fn field(&self, dotted: &str) -> Option<&Value> {
        if let Some(value) = self.envelope.get(dotted) {
            return Some(value);
        }
        let mut parts = dotted.split('.');
        let first = parts.next()?;
        parts.try_fold(self.envelope.get(first)?, |value, part| value.get(part))
    }

    /// Host hint for plaintext URLs when the log line has no destination.
    pub fn host_hint(&self) -> Option<String> {
        ["url.domain", "host.hostname"]
            .iter()
            .filter_map(|key| self.field(key))
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Envelope fields flattened to dotted keys. Arrays and scalars are leaves.
    pub fn flattened_envelope(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        for (key, value) in &self.envelope {
            flatten_into(key.clone(), value, &mut out);
        }
        out
    }
}

fn flatten_into(prefix: String, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(format!("{prefix}.{key}"), child, out);
            }
        }
        _ => out.push((prefix, value.clone())),
    }
}

/// Decodes one stream record.
pub fn decode_record(record: &KinesisStreamRecord) -> Result<RawLogEvent, DecodeError> {
    let sequence_number = record.kinesis.sequence_number.clone();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(record.kinesis.data.trim())
        .map_err(|source| DecodeError::Base64 {
            sequence_number: sequence_number.clone(),
            source,
        })?;

    let payload: Value = serde_json::from_slice(&bytes).map_err(|source| DecodeError::Json {
        sequence_number: sequence_number.clone(),
        source,
    })?;

    let Value::Object(mut envelope) = payload else {
        return Err(DecodeError::NotAnObject { sequence_number });
    };

    let message = match envelope.remove("message") {
        Some(Value::String(message)) => message,
        _ => return Err(DecodeError::MissingMessage { sequence_number }),
    };

    Ok(RawLogEvent {
        sequence_number,
        message,
        envelope,
    })
}
