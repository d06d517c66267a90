//! Batch ingestion.
//!
//! One stream invocation: decode every record, parse and transform each log
//! line, bulk-write the documents, then resubmit only the documents the store
//! rejected, for a bounded number of rounds.
//!
//! Identifiers are assigned once, before the first write, and kept across
//! rounds. A resubmitted document that actually landed earlier is then reported
//! by the store as a `create` conflict, which counts as written.

mod retry;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::bulk::{BulkWriteClient, FailedDocument};
use crate::error_handling::{IngestError, IngestMetric, IngestStats};
use crate::geoip::{EnrichedGeoData, GeoEnrichment};
use crate::parser;
use crate::random::{document_id, Randomizer};
use crate::stream::{decode_record, KinesisStreamEvent, RawLogEvent};
use crate::transform::{EcsDocument, SchemaTransformer};

pub use retry::RetryPolicy;

/// Summary of a batch that was fully written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Records in the batch
    pub records: usize,
    /// Documents built from decodable records
    pub documents: usize,
    /// Bulk writes performed, including the first one
    pub attempts: usize,
    /// Counter values for this batch
    pub stats: BTreeMap<&'static str, usize>,
}

/// Handles stream batches. Collaborators are supplied at construction time.
pub struct KinesisStreamHandler {
    geo: Arc<dyn GeoEnrichment>,
    client: Arc<dyn BulkWriteClient>,
    randomizer: Arc<dyn Randomizer>,
    transformer: SchemaTransformer,
    retry: RetryPolicy,
}

impl KinesisStreamHandler {
    /// Handler with the default transformer and retry policy.
    pub fn new(
        geo: Arc<dyn GeoEnrichment>,
        client: Arc<dyn BulkWriteClient>,
        randomizer: Arc<dyn Randomizer>,
    ) -> Self {
        KinesisStreamHandler {
            geo,
            client,
            randomizer,
            transformer: SchemaTransformer::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the schema transformer.
    pub fn with_transformer(mut self, transformer: SchemaTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the document for one decoded record, without an identifier.
    pub fn transform_record(&self, event: &RawLogEvent) -> EcsDocument {
        self.build_document(event).0
    }

    /// Document plus whether its line matched no layout.
    fn build_document(&self, event: &RawLogEvent) -> (EcsDocument, bool) {
        let record = parser::parse(&event.message).with_default_destination(event.host_hint());

        let enrichment = match &record.client_ip {
            Some(ip) => self.geo.enrich(ip),
            None => EnrichedGeoData::default(),
        };

        let mut document = self.transformer.transform(&record, &enrichment);
        document.insert("event.original", event.message.clone());
        for (key, value) in event.flattened_envelope() {
            document.merge_passthrough(key, value);
        }
        (document, record.is_malformed())
    }

    /// Decodes and transforms a batch, assigning identifiers.
    ///
    /// Undecodable records are logged and skipped. Output order follows the
    /// input order of the remaining records.
    pub fn transform_to_ecs(&self, event: &KinesisStreamEvent) -> Vec<EcsDocument> {
        self.build_documents(event, &IngestStats::new())
    }

    fn build_documents(&self, event: &KinesisStreamEvent, stats: &IngestStats) -> Vec<EcsDocument> {
        stats.add(IngestMetric::RecordsReceived, event.records.len());
        event
            .records
            .iter()
            .filter_map(|record| match decode_record(record) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    log::warn!("Skipping undecodable record: {e}");
                    stats.increment(IngestMetric::DecodeFailures);
                    None
                }
            })
            .map(|raw| {
                let (mut document, malformed) = self.build_document(&raw);
                if malformed {
                    stats.increment(IngestMetric::MalformedLines);
                }
                document.set_id(document_id(self.randomizer.as_ref()));
                stats.increment(IngestMetric::DocumentsBuilt);
                document
            })
            .collect()
    }

    /// Processes one batch.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::UnresolvedDocuments` when documents are still
    /// failing after the last retry round. Decode failures and malformed lines
    /// never fail the batch.
    pub async fn handle(&self, event: &KinesisStreamEvent) -> Result<IngestReport, IngestError> {
        let stats = IngestStats::new();
        let mut pending = self.build_documents(event, &stats);
        let documents = pending.len();
        let mut delays = self.retry.delays();
        let mut attempts = 0;

        while !pending.is_empty() {
            attempts += 1;
            log::info!("Bulk round {}: writing {} document(s)", attempts, pending.len());

            let result = self.client.write(&pending).await;
            let failed: Vec<FailedDocument> = match result {
                Ok(outcome) => {
                    stats.add(IngestMetric::DocumentsWritten, outcome.written);
                    stats.add(IngestMetric::ItemWriteFailures, outcome.errors.len());
                    outcome.errors
                }
                Err(e) => {
                    log::warn!("Bulk round {attempts} failed as a whole: {e}");
                    stats.increment(IngestMetric::TransportFailures);
                    let error = json!({ "reason": e.to_string() });
                    pending
                        .into_iter()
                        .enumerate()
                        .map(|(position, document)| FailedDocument {
                            position,
                            document,
                            error: error.clone(),
                        })
                        .collect()
                }
            };

            if failed.is_empty() {
                break;
            }
            log::warn!("Bulk round {}: {} document(s) failed", attempts, failed.len());

            if attempts > self.retry.max_retry_rounds {
                log::error!(
                    "{} document(s) unresolved after {} bulk attempt(s)",
                    failed.len(),
                    attempts
                );
                stats.add(IngestMetric::UnresolvedDocuments, failed.len());
                stats.log_summary();
                return Err(IngestError::UnresolvedDocuments { failed, attempts });
            }

            if let Some(delay) = delays.next().filter(|d| !d.is_zero()) {
                tokio::time::sleep(delay).await;
            }
            stats.add(IngestMetric::RetriedDocuments, failed.len());
            pending = failed.into_iter().map(|f| f.document).collect();
        }

        stats.log_summary();
        Ok(IngestReport {
            records: event.records.len(),
            documents,
            attempts,
            stats: stats.snapshot(),
        })
    }
}
