//! Error type definitions.
//!
//! Record-local errors (`DecodeError`) never abort a batch. `BulkWriteError`
//! fails a single bulk round. `IngestError` is the only error a batch
//! invocation returns, once the retry budget is exhausted.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::bulk::FailedDocument;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Missing or unusable configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Failure to turn a stream record into a `RawLogEvent`.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The record data is not valid base64.
    #[error("record {sequence_number}: payload is not valid base64: {source}")]
    Base64 {
        /// Sequence number of the record
        sequence_number: String,
        /// Decoder error
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded data is not valid JSON.
    #[error("record {sequence_number}: payload is not valid JSON: {source}")]
    Json {
        /// Sequence number of the record
        sequence_number: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// The decoded JSON is not an object.
    #[error("record {sequence_number}: payload is not a JSON object")]
    NotAnObject {
        /// Sequence number of the record
        sequence_number: String,
    },

    /// The envelope has no string `message` field.
    #[error("record {sequence_number}: payload has no string `message` field")]
    MissingMessage {
        /// Sequence number of the record
        sequence_number: String,
    },
}

/// Failure of the HTTP transport underneath the bulk client.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be built or signed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request failed on the wire.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
}

impl TransportError {
    /// Connectivity problems that a fresh attempt may get past.
    pub fn is_retriable(&self) -> bool {
        match self {
            TransportError::InvalidRequest(_) => false,
            TransportError::Request(e) => e.is_timeout() || e.is_connect(),
        }
    }
}

/// Failure of a whole bulk round.
///
/// Per-item failures are not errors; they are reported in the `BulkWriteOutcome`.
#[derive(Error, Debug)]
pub enum BulkWriteError {
    /// The transport failed before a response arrived.
    #[error("bulk transport error: {0}")]
    Transport(#[from] TransportError),

    /// The store answered with a non-2xx status.
    #[error("bulk request rejected with HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body is not a bulk response.
    #[error("bulk response could not be parsed: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// The response does not have one item per document.
    #[error("bulk response has {actual} items for {expected} documents")]
    ItemCountMismatch {
        /// Documents submitted
        expected: usize,
        /// Items returned
        actual: usize,
    },
}

/// Batch-level failure surfaced to the stream runtime.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Documents were still failing after the last retry round.
    #[error("{} document(s) unresolved after {attempts} bulk attempt(s)", .failed.len())]
    UnresolvedDocuments {
        /// Documents still failing, with their last error
        failed: Vec<FailedDocument>,
        /// Bulk writes performed
        attempts: usize,
    },
}

/// Events counted while processing one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum IngestMetric {
    /// Records in the batch
    RecordsReceived,
    /// Records skipped because they could not be decoded
    DecodeFailures,
    /// Lines that matched no layout or had an invalid timestamp
    MalformedLines,
    /// Documents built
    DocumentsBuilt,
    /// Documents the store accepted
    DocumentsWritten,
    /// Per-document rejections
    ItemWriteFailures,
    /// Bulk rounds that failed as a whole
    TransportFailures,
    /// Documents resubmitted in a later round
    RetriedDocuments,
    /// Documents still failing after the last round
    UnresolvedDocuments,
}

impl std::fmt::Display for IngestMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestMetric {
    /// Label used in logs and report snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMetric::RecordsReceived => "records received",
            IngestMetric::DecodeFailures => "decode failures",
            IngestMetric::MalformedLines => "malformed lines",
            IngestMetric::DocumentsBuilt => "documents built",
            IngestMetric::DocumentsWritten => "documents written",
            IngestMetric::ItemWriteFailures => "item write failures",
            IngestMetric::TransportFailures => "transport failures",
            IngestMetric::RetriedDocuments => "retried documents",
            IngestMetric::UnresolvedDocuments => "unresolved documents",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_metric_labels_are_unique() {
        let labels: std::collections::HashSet<_> =
            IngestMetric::iter().map(|m| m.as_str()).collect();
        assert_eq!(labels.len(), IngestMetric::iter().count());
    }

    #[test]
    fn test_unresolved_error_message_counts_documents() {
        let err = IngestError::UnresolvedDocuments {
            failed: Vec::new(),
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "0 document(s) unresolved after 4 bulk attempt(s)"
        );
    }

    #[test]
    fn test_decode_error_names_sequence_number() {
        let err = DecodeError::MissingMessage {
            sequence_number: "42".to_string(),
        };
        assert!(err.to_string().contains("record 42"));
    }

    #[test]
    fn test_invalid_request_is_not_retriable() {
        let err = TransportError::InvalidRequest("bad header".to_string());
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_item_count_mismatch_message() {
        let err = BulkWriteError::ItemCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "bulk response has 2 items for 3 documents"
        );
    }
}
