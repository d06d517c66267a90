//! Bulk client for OpenSearch/Elasticsearch compatible stores.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::bulk::ndjson::{build_bulk_body, BulkResponse, NDJSON_CONTENT_TYPE};
use crate::bulk::transport::{HttpRequest, HttpTransport};
use crate::bulk::{BulkWriteClient, BulkWriteOutcome, FailedDocument};
use crate::error_handling::{BulkWriteError, InitializationError, TransportError};
use crate::transform::EcsDocument;

const BULK_PATH: &str = "_bulk";

/// Writes documents with one `_bulk` request per call.
pub struct OpenSearchBulkClient {
    transport: Arc<dyn HttpTransport>,
    bulk_url: Url,
}

impl OpenSearchBulkClient {
    /// Creates a client for the store at `endpoint` (e.g. `https://search.example.com`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `endpoint` is not an absolute http(s) URL.
    pub fn new(endpoint: &str, transport: Arc<dyn HttpTransport>) -> Result<Self, InitializationError> {
        let mut base = Url::parse(endpoint).map_err(|e| {
            InitializationError::ConfigError(format!("invalid bulk endpoint {endpoint:?}: {e}"))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(InitializationError::ConfigError(format!(
                "bulk endpoint must be http(s): {endpoint}"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let bulk_url = base.join(BULK_PATH).map_err(|e| {
            InitializationError::ConfigError(format!("invalid bulk endpoint {endpoint:?}: {e}"))
        })?;
        Ok(OpenSearchBulkClient {
            transport,
            bulk_url,
        })
    }

    /// Full `_bulk` URL requests are posted to.
    pub fn bulk_url(&self) -> &Url {
        &self.bulk_url
    }
}

#[async_trait]
impl BulkWriteClient for OpenSearchBulkClient {
    async fn write(&self, documents: &[EcsDocument]) -> Result<BulkWriteOutcome, BulkWriteError> {
        if documents.is_empty() {
            return Ok(BulkWriteOutcome::succeeded(0));
        }

        let body = build_bulk_body(documents)
            .map_err(|e| TransportError::InvalidRequest(format!("bulk body: {e}")))?;
        log::debug!(
            "POST {} ({} documents, {} bytes)",
            self.bulk_url,
            documents.len(),
            body.len()
        );

        let response = self
            .transport
            .send(HttpRequest::post(
                self.bulk_url.clone(),
                NDJSON_CONTENT_TYPE,
                body,
            ))
            .await?;

        if !response.is_success() {
            return Err(BulkWriteError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: BulkResponse = serde_json::from_str(&response.body)?;
        if parsed.items.len() != documents.len() {
            return Err(BulkWriteError::ItemCountMismatch {
                expected: documents.len(),
                actual: parsed.items.len(),
            });
        }

        // Items are matched to documents by position only
        let errors: Vec<FailedDocument> = documents
            .iter()
            .zip(&parsed.items)
            .enumerate()
            .filter(|(_, (_, item))| item.is_failure())
            .map(|(position, (document, item))| FailedDocument {
                position,
                document: document.clone(),
                error: item.error_payload(),
            })
            .collect();

        if parsed.errors && errors.is_empty() {
            log::debug!("Bulk response flagged errors, all of them create conflicts");
        }

        Ok(BulkWriteOutcome::from_failures(documents.len(), errors))
    }
}
