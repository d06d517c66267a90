//! Run orchestration: wires configuration to the handler for one batch.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::bulk::{
    AwsCredentials, BulkWriteClient, BulkWriteOutcome, OpenSearchBulkClient, SigV4Signer,
    SignedHttpTransport,
};
use crate::config::{Config, TRANSPORT_RETRY_INITIAL_DELAY_MS};
use crate::error_handling::BulkWriteError;
use crate::geoip::MaxMindGeoEnrichment;
use crate::handler::{IngestReport, KinesisStreamHandler, RetryPolicy};
use crate::initialization::init_client;
use crate::random::ThreadRandomizer;
use crate::stream::KinesisStreamEvent;
use crate::transform::{EcsDocument, SchemaTransformer};

/// What a run produced.
#[derive(Debug)]
pub enum RunReport {
    /// Documents were written to the store
    Ingested(IngestReport),
    /// Documents were built but not written (`--dry-run`)
    DryRun(Vec<EcsDocument>),
}

/// Accepts every document and keeps it, for dry runs.
#[derive(Default)]
struct CollectingBulkClient {
    documents: Mutex<Vec<EcsDocument>>,
}

#[async_trait]
impl BulkWriteClient for CollectingBulkClient {
    async fn write(
        &self,
        documents: &[EcsDocument],
    ) -> Result<BulkWriteOutcome, BulkWriteError> {
        if let Ok(mut kept) = self.documents.lock() {
            kept.extend_from_slice(documents);
        }
        Ok(BulkWriteOutcome::succeeded(documents.len()))
    }
}

/// Runs one batch from the configured input.
///
/// # Errors
///
/// Returns an error if the input cannot be read, a GeoIP database cannot be
/// loaded, the store configuration is incomplete, or documents remain
/// unresolved after the last retry round.
pub async fn run_ingest(config: Config) -> Result<RunReport> {
    let event = read_event(&config.input).await?;
    log::info!("Read {} record(s) from {}", event.records.len(), config.input.display());

    let geo = MaxMindGeoEnrichment::open(config.geoip_city.as_deref(), config.geoip_asn.as_deref())
        .await
        .context("Failed to load GeoIP databases")?;
    let transformer = SchemaTransformer::from_config(&config)?;
    let retry = RetryPolicy::from_config(&config);

    if config.dry_run {
        let collector = Arc::new(CollectingBulkClient::default());
        let handler =
            KinesisStreamHandler::new(Arc::new(geo), collector.clone(), Arc::new(ThreadRandomizer))
                .with_transformer(transformer)
                .with_retry_policy(retry);
        handler.handle(&event).await?;
        let documents = collector
            .documents
            .lock()
            .map(|mut kept| std::mem::take(&mut *kept))
            .unwrap_or_default();
        return Ok(RunReport::DryRun(documents));
    }

    let endpoint = config
        .endpoint
        .as_deref()
        .context("A bulk endpoint is required unless --dry-run is set")?;
    let signer = if config.sign_requests {
        let credentials =
            AwsCredentials::from_env().context("Signing is enabled but credentials are missing")?;
        Some(SigV4Signer::new(
            credentials,
            config.region.clone(),
            config.signing_service.clone(),
        ))
    } else {
        None
    };
    let transport = SignedHttpTransport::new(init_client(&config)?, signer)
        .with_retry(config.transport_attempts, TRANSPORT_RETRY_INITIAL_DELAY_MS);
    let client = OpenSearchBulkClient::new(endpoint, Arc::new(transport))?;
    log::info!("Writing to {}", client.bulk_url());

    let handler =
        KinesisStreamHandler::new(Arc::new(geo), Arc::new(client), Arc::new(ThreadRandomizer))
            .with_transformer(transformer)
            .with_retry_policy(retry);
    let report = handler.handle(&event).await?;
    Ok(RunReport::Ingested(report))
}

async fn read_event(input: &Path) -> Result<KinesisStreamEvent> {
    let raw = if input.as_os_str() == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read stream event from stdin")?;
        raw
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read stream event from {}", input.display()))?
    };
    serde_json::from_str(&raw).context("Input is not a stream event (expected {\"Records\": [...]})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use serde_json::json;
    use tempfile::TempDir;

    fn event_file(dir: &TempDir, messages: &[&str]) -> std::path::PathBuf {
        let records: Vec<_> = messages
            .iter()
            .enumerate()
            .map(|(i, message)| {
                let data = base64::engine::general_purpose::STANDARD
                    .encode(json!({ "message": message }).to_string());
                json!({"kinesis": {"sequenceNumber": i.to_string(), "data": data}})
            })
            .collect();
        let path = dir.path().join("event.json");
        std::fs::write(&path, json!({ "Records": records }).to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_dry_run_returns_documents() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            input: event_file(
                &dir,
                &[r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#],
            ),
            dry_run: true,
            ..Default::default()
        };
        match run_ingest(config).await.unwrap() {
            RunReport::DryRun(documents) => {
                assert_eq!(documents.len(), 1);
                assert!(documents[0].id().is_some());
                assert_eq!(documents[0].index(), "access-logs-2000.10.10");
            }
            other => panic!("expected dry run, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            input: event_file(&dir, &["x"]),
            ..Default::default()
        };
        let err = run_ingest(config).await.unwrap_err();
        assert!(err.to_string().contains("bulk endpoint is required"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, "not json").unwrap();
        let config = Config {
            input: path,
            dry_run: true,
            ..Default::default()
        };
        assert!(run_ingest(config).await.is_err());
    }
}
