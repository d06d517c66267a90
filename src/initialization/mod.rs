//! Application initialization and resource setup.
//!
//! Shared resources are created once per process: the logger, the HTTP client
//! behind the bulk transport, and the GeoIP readers (see [`crate::geoip`]).

mod client;
mod logger;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
