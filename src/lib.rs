//! access_log_ingest library: access log stream ingestion
//!
//! Decodes batches of stream records carrying web-server access log lines,
//! parses the known log layouts, enriches client addresses with GeoIP data,
//! maps each line to a flat ECS-style document and bulk-writes the documents
//! to an OpenSearch/Elasticsearch compatible store, retrying only the
//! documents the store rejected.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use access_log_ingest::bulk::{OpenSearchBulkClient, SignedHttpTransport};
//! use access_log_ingest::geoip::NoopGeoEnrichment;
//! use access_log_ingest::handler::KinesisStreamHandler;
//! use access_log_ingest::random::ThreadRandomizer;
//! use access_log_ingest::stream::KinesisStreamEvent;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SignedHttpTransport::new(Arc::new(reqwest::Client::new()), None);
//! let client = OpenSearchBulkClient::new("http://localhost:9200", Arc::new(transport))?;
//! let handler = KinesisStreamHandler::new(
//!     Arc::new(NoopGeoEnrichment),
//!     Arc::new(client),
//!     Arc::new(ThreadRandomizer),
//! );
//!
//! let event: KinesisStreamEvent = serde_json::from_str(r#"{"Records":[]}"#)?;
//! let report = handler.handle(&event).await?;
//! println!("{} documents in {} bulk attempt(s)", report.documents, report.attempts);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! Bulk writes are async and require a Tokio runtime.

#![warn(missing_docs)]

pub mod bulk;
pub mod config;
pub mod error_handling;
pub mod geoip;
pub mod handler;
pub mod initialization;
pub mod parser;
pub mod random;
pub mod stream;
pub mod transform;

mod run;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, Opt};
pub use error_handling::IngestError;
pub use handler::{IngestReport, KinesisStreamHandler, RetryPolicy};
pub use run::{run_ingest, RunReport};
pub use transform::EcsDocument;
