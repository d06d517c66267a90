//! Bulk writes to the search store.
//!
//! [`BulkWriteClient`] is the seam the batch handler depends on. The store
//! adapter ([`OpenSearchBulkClient`]) turns documents into a bulk request,
//! sends it through an [`HttpTransport`] and reports per-document results in
//! submission order.

mod client;
mod ndjson;
mod sigv4;
mod transport;

use async_trait::async_trait;
use serde_json::Value;

use crate::error_handling::BulkWriteError;
use crate::transform::EcsDocument;

// Re-export public API
pub use client::OpenSearchBulkClient;
pub use ndjson::{
    build_bulk_body, BulkItemResult, BulkResponse, BulkResponseItem, CONFLICT_STATUS,
    NDJSON_CONTENT_TYPE,
};
pub use sigv4::{AwsCredentials, SigV4Signer};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, SignedHttpTransport};

/// A document the store did not accept, kept whole for resubmission.
#[derive(Debug, Clone)]
pub struct FailedDocument {
    /// Position in the submitted slice
    pub position: usize,
    /// The rejected document, identifier included
    pub document: EcsDocument,
    /// Error payload as reported by the store
    pub error: Value,
}

/// Result of one bulk write.
#[derive(Debug, Clone)]
pub struct BulkWriteOutcome {
    /// True when every document was accepted
    pub success: bool,
    /// Documents accepted by the store
    pub written: usize,
    /// Rejected documents in submission order
    pub errors: Vec<FailedDocument>,
}

impl BulkWriteOutcome {
    /// Every submitted document was written.
    pub fn succeeded(written: usize) -> Self {
        BulkWriteOutcome {
            success: true,
            written,
            errors: Vec::new(),
        }
    }

    /// Outcome where `errors` were rejected out of `submitted` documents.
    pub fn from_failures(submitted: usize, errors: Vec<FailedDocument>) -> Self {
        BulkWriteOutcome {
            success: errors.is_empty(),
            written: submitted.saturating_sub(errors.len()),
            errors,
        }
    }
}

/// Writes documents to the store.
///
/// Implementations report one result per document in submission order. Store
/// rejections of individual documents are returned in the outcome; `Err` means
/// the request as a whole did not complete.
#[async_trait]
pub trait BulkWriteClient: Send + Sync {
    /// Writes `documents` in one bulk request. Per-document rejections are part of the outcome, not errors.
    async fn write(&self, documents: &[EcsDocument]) -> Result<BulkWriteOutcome, BulkWriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_failures() {
        let outcome = BulkWriteOutcome::from_failures(
            3,
            vec![FailedDocument {
                position: 1,
                document: EcsDocument::new("idx"),
                error: Value::Null,
            }],
        );
        assert!(!outcome.success);
        assert_eq!(outcome.written, 2);

        let outcome = BulkWriteOutcome::from_failures(3, Vec::new());
        assert!(outcome.success);
        assert_eq!(outcome.written, 3);
    }
}
