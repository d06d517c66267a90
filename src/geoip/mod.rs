//! GeoIP enrichment using MaxMind GeoLite2 databases.
//!
//! Two independent lookups keyed by client address: network/ASN and
//! city/location. Databases are read from local files once at start-up. A
//! missing match is not an error and never fails the pipeline.

mod loader;
mod lookup;
mod metadata;
mod types;

// Re-export public API
pub use lookup::MaxMindGeoEnrichment;
pub use types::{CityInfo, EnrichedGeoData, GeoIpMetadata, NetworkInfo};

/// Read-only address lookups. Implementations must be safe to share.
pub trait GeoEnrichment: Send + Sync {
    /// Network/ASN attributes for `ip`, `None` when unknown.
    fn lookup_network(&self, ip: &str) -> Option<NetworkInfo>;

    /// City/location attributes for `ip`, `None` when unknown.
    fn lookup_city(&self, ip: &str) -> Option<CityInfo>;

    /// Runs both lookups.
    fn enrich(&self, ip: &str) -> EnrichedGeoData {
        EnrichedGeoData {
            network: self.lookup_network(ip),
            city: self.lookup_city(ip),
        }
    }
}

/// Enrichment that never matches, for running without databases.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGeoEnrichment;

impl GeoEnrichment for NoopGeoEnrichment {
    fn lookup_network(&self, _ip: &str) -> Option<NetworkInfo> {
        None
    }

    fn lookup_city(&self, _ip: &str) -> Option<CityInfo> {
        None
    }
}
