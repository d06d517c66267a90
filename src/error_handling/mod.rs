//! Error handling and ingestion statistics.
//!
//! This module provides:
//! - Error type definitions for each stage of the pipeline
//! - Per-batch statistics tracking
//!
//! Errors are scoped by how far they reach:
//! - **Record**: an undecodable envelope is skipped
//! - **Round**: a failed bulk request fails every document in that round
//! - **Batch**: documents still failing after the retry budget fail the invocation

mod stats;
mod types;

// Re-export public API
pub use stats::IngestStats;
pub use types::{
    BulkWriteError, DecodeError, IngestError, IngestMetric, InitializationError, TransportError,
};
