//! IP address lookups against preloaded MaxMind databases.
//!
//! The readers are loaded once and never mutated, so a single
//! `MaxMindGeoEnrichment` can be shared across concurrent invocations.

use std::net::IpAddr;
use std::path::Path;

use anyhow::Result;
use maxminddb::Reader;

use super::loader::load_from_file;
use super::types::{CityInfo, GeoIpMetadata, NetworkInfo};
use super::GeoEnrichment;

/// GeoIP enrichment backed by GeoLite2-City and GeoLite2-ASN databases.
///
/// Either database may be missing; the corresponding lookup then always
/// returns `None`.
pub struct MaxMindGeoEnrichment {
    city: Option<(Reader<Vec<u8>>, GeoIpMetadata)>,
    asn: Option<(Reader<Vec<u8>>, GeoIpMetadata)>,
}

impl MaxMindGeoEnrichment {
    /// Loads the databases that have a path.
    pub async fn open(city_path: Option<&Path>, asn_path: Option<&Path>) -> Result<Self> {
        let city = match city_path {
            Some(path) => Some(load_from_file(path).await?),
            None => {
                log::info!("GeoIP city lookup disabled (no database path provided)");
                None
            }
        };
        let asn = match asn_path {
            Some(path) => Some(load_from_file(path).await?),
            None => {
                log::info!("GeoIP ASN lookup disabled (no database path provided)");
                None
            }
        };
        Ok(MaxMindGeoEnrichment { city, asn })
    }

    /// Checks if any database is loaded.
    pub fn is_enabled(&self) -> bool {
        self.city.is_some() || self.asn.is_some()
    }

    /// Metadata of the loaded databases (city first).
    pub fn metadata(&self) -> Vec<&GeoIpMetadata> {
        self.city
            .iter()
            .chain(self.asn.iter())
            .map(|(_, metadata)| metadata)
            .collect()
    }
}

impl GeoEnrichment for MaxMindGeoEnrichment {
    fn lookup_network(&self, ip: &str) -> Option<NetworkInfo> {
        let (reader, _) = self.asn.as_ref()?;
        let ip_addr = routable_address(ip)?;

        // maxminddb 0.27 API: lookup() returns Result<LookupResult, MaxMindDbError>
        let asn_lookup = reader.lookup(ip_addr).ok()?;
        if !asn_lookup.has_data() {
            return None;
        }
        let asn_result = asn_lookup.decode::<maxminddb::geoip2::Asn>().ok()??;

        Some(NetworkInfo {
            asn: asn_result.autonomous_system_number,
            organization: asn_result
                .autonomous_system_organization
                .map(|s| s.to_string()),
        })
    }

    fn lookup_city(&self, ip: &str) -> Option<CityInfo> {
        let (reader, _) = self.city.as_ref()?;
        let ip_addr = routable_address(ip)?;

        let city_lookup = reader.lookup(ip_addr).ok()?;
        if !city_lookup.has_data() {
            return None;
        }
        let city_result = city_lookup.decode::<maxminddb::geoip2::City>().ok()??;

        // Fields are direct types in 0.27; the names inside are optional
        Some(CityInfo {
            city_name: city_result.city.names.english.map(|s| s.to_string()),
            country_iso_code: city_result.country.iso_code.map(|s| s.to_string()),
            country_name: city_result.country.names.english.map(|s| s.to_string()),
            region_name: city_result
                .subdivisions
                .first()
                .and_then(|subdivision| subdivision.names.english)
                .map(|s| s.to_string()),
            postal_code: city_result.postal.code.map(|s| s.to_string()),
            timezone: city_result.location.time_zone.map(|s| s.to_string()),
            latitude: city_result.location.latitude,
            longitude: city_result.location.longitude,
        })
    }
}

/// Parses `ip`, rejecting private, loopback and other non-routable ranges.
///
/// Those never have database entries, so they are not looked up.
pub(crate) fn routable_address(ip: &str) -> Option<IpAddr> {
    let addr: IpAddr = ip.parse().ok()?;
    let reserved = match addr {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
        }
    };
    (!reserved).then_some(addr)
}
