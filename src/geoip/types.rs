//! GeoIP data structures.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Metadata about a loaded GeoIP database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpMetadata {
    /// Source path
    pub source: String,
    /// Database type reported by the file, e.g. `GeoLite2-City`
    pub database_type: String,
    /// Database build date/version (extracted from database)
    pub version: String,
    /// Load timestamp
    pub last_updated: SystemTime,
}

/// Network attributes from the ASN database.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkInfo {
    /// Autonomous system number
    pub asn: Option<u32>,
    /// Organization owning the AS
    pub organization: Option<String>,
}

/// Location attributes from the City database.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityInfo {
    /// City name (English)
    pub city_name: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country_iso_code: Option<String>,
    /// Country name (English)
    pub country_name: Option<String>,
    /// First subdivision name (English)
    pub region_name: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// IANA time zone
    pub timezone: Option<String>,
    /// Latitude in degrees
    pub latitude: Option<f64>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
}

/// Result of both lookups for one client address. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedGeoData {
    /// ASN lookup result
    pub network: Option<NetworkInfo>,
    /// City lookup result
    pub city: Option<CityInfo>,
}

impl EnrichedGeoData {
    /// True when neither lookup matched.
    pub fn is_empty(&self) -> bool {
        self.network.is_none() && self.city.is_none()
    }
}
