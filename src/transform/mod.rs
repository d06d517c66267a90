//! Mapping of parsed access log records to normalized documents.
//!
//! The transformer is pure: identical inputs give identical documents, and a
//! missing input field only ever omits the matching output field.

mod document;

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::{Map, Value};
use url::Url;

use crate::config::{
    Config, DEFAULT_INDEX_DATE_FORMAT, DEFAULT_INDEX_PREFIX, DEFAULT_PLAINTEXT_PORT,
    FALLBACK_INDEX_SUFFIX, PLAINTEXT_SCHEME,
};
use crate::error_handling::InitializationError;
use crate::geoip::{CityInfo, EnrichedGeoData, NetworkInfo};
use crate::parser::ParsedLogRecord;

pub use document::EcsDocument;

/// Builds `EcsDocument`s with a fixed index naming scheme.
#[derive(Debug, Clone)]
pub struct SchemaTransformer {
    index_prefix: String,
    index_date_format: String,
}

impl Default for SchemaTransformer {
    fn default() -> Self {
        SchemaTransformer {
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            index_date_format: DEFAULT_INDEX_DATE_FORMAT.to_string(),
        }
    }
}

impl SchemaTransformer {
    /// Creates a transformer routing to `<prefix>-<date>` indices.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the prefix is empty or the date format is not a
    /// valid strftime pattern.
    pub fn new(
        index_prefix: impl Into<String>,
        index_date_format: impl Into<String>,
    ) -> Result<Self, InitializationError> {
        let transformer = SchemaTransformer {
            index_prefix: index_prefix.into(),
            index_date_format: index_date_format.into(),
        };
        if transformer.index_prefix.is_empty() {
            return Err(InitializationError::ConfigError(
                "index prefix must not be empty".to_string(),
            ));
        }
        let probe = Utc.timestamp_opt(0, 0).single().map(|t| t.fixed_offset());
        if probe.and_then(|t| transformer.dated_index(&t)).is_none() {
            return Err(InitializationError::ConfigError(format!(
                "invalid index date format: {:?}",
                transformer.index_date_format
            )));
        }
        Ok(transformer)
    }

    /// Transformer using the configured index prefix and date format.
    pub fn from_config(config: &Config) -> Result<Self, InitializationError> {
        Self::new(config.index_prefix.clone(), config.index_date_format.clone())
    }

    /// Index for an event: partitioned by the UTC date of its timestamp.
    pub fn index_for(&self, timestamp: Option<&DateTime<FixedOffset>>) -> String {
        timestamp
            .and_then(|t| self.dated_index(t))
            .unwrap_or_else(|| format!("{}-{}", self.index_prefix, FALLBACK_INDEX_SUFFIX))
    }

    fn dated_index(&self, timestamp: &DateTime<FixedOffset>) -> Option<String> {
        let mut index = format!("{}-", self.index_prefix);
        // DelayedFormat reports bad patterns through fmt::Error
        write!(
            index,
            "{}",
            timestamp
                .with_timezone(&Utc)
                .format(&self.index_date_format)
        )
        .ok()?;
        Some(index)
    }

    /// Maps a parsed record and its enrichment to a document.
    pub fn transform(&self, record: &ParsedLogRecord, enrichment: &EnrichedGeoData) -> EcsDocument {
        let mut doc = EcsDocument::new(self.index_for(record.timestamp.as_ref()));

        doc.insert_opt("@timestamp", record.timestamp.map(|t| t.to_rfc3339()));
        doc.insert("labels.log_format", record.format_variant.as_ref());

        // client
        doc.insert_opt("client.ip", record.client_ip.clone());
        doc.insert("client.geo", geo_object(enrichment.city.as_ref()));
        if let Some(network) = &enrichment.network {
            insert_network(&mut doc, network);
        }

        // http
        if let Some(request) = &record.request_line {
            doc.insert("http.request.line", request.raw.clone());
            doc.insert_opt("http.request.method", request.method.clone());
            doc.insert_opt("http.version", request.version().map(str::to_string));
        }
        doc.insert_opt("http.request.bytes", record.request_bytes);
        doc.insert_opt("http.request.referrer", record.referrer.clone());
        doc.insert_opt("http.response.status_code", record.status_code);
        doc.insert_opt("http.response.bytes", record.response_bytes);
        doc.insert_opt("user_agent.original", record.user_agent.clone());
        doc.insert_opt(
            "event.duration",
            record
                .response_time_ms
                .map(|ms| ms.saturating_mul(1_000_000)),
        );

        // tls
        if let Some(protocol) = &record.tls_protocol {
            let (name, version) = split_tls_protocol(protocol);
            doc.insert("tls.version_protocol", name);
            doc.insert_opt("tls.version", version);
        }
        doc.insert_opt("tls.cipher", record.tls_cipher.clone());

        insert_url(&mut doc, record);
        doc
    }
}

fn insert_network(doc: &mut EcsDocument, network: &NetworkInfo) {
    doc.insert_opt("client.as.number", network.asn);
    doc.insert_opt("client.as.organization.name", network.organization.clone());
}

/// `client.geo` object. Empty when the city lookup had no match.
fn geo_object(city: Option<&CityInfo>) -> Value {
    let mut geo = Map::new();
    let Some(city) = city else {
        return Value::Object(geo);
    };
    let text_fields = [
        ("city_name", &city.city_name),
        ("country_iso_code", &city.country_iso_code),
        ("country_name", &city.country_name),
        ("region_name", &city.region_name),
        ("postal_code", &city.postal_code),
        ("timezone", &city.timezone),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            geo.insert(key.to_string(), Value::from(value.as_str()));
        }
    }
    if let (Some(lat), Some(lon)) = (city.latitude, city.longitude) {
        let mut location = Map::new();
        location.insert("lat".to_string(), Value::from(lat));
        location.insert("lon".to_string(), Value::from(lon));
        geo.insert("location".to_string(), Value::Object(location));
    }
    Value::Object(geo)
}

/// `TLSv1.2` becomes (`tls`, `1.2`). Unknown shapes are kept whole.
fn split_tls_protocol(protocol: &str) -> (String, Option<String>) {
    match protocol.split_once('v') {
        Some((name, version))
            if !name.is_empty() && version.starts_with(|c: char| c.is_ascii_digit()) =>
        {
            (name.to_ascii_lowercase(), Some(version.to_string()))
        }
        _ => (protocol.to_ascii_lowercase(), None),
    }
}

/// URL fields. TLS traffic only exposes `url.uri`; scheme, host and port are
/// derived for plaintext traffic.
fn insert_url(doc: &mut EcsDocument, record: &ParsedLogRecord) {
    let uri = record
        .request_line
        .as_ref()
        .and_then(|request| request.path.clone());
    doc.insert_opt("url.uri", uri.clone());

    if record.is_tls() {
        return;
    }

    let (domain, port) = match record.destination.as_deref().and_then(parse_destination) {
        Some((domain, port)) => (Some(domain), port),
        None => (None, DEFAULT_PLAINTEXT_PORT),
    };
    doc.insert("url.scheme", PLAINTEXT_SCHEME);
    doc.insert("url.port", port);
    if let Some(domain) = domain {
        let full = format!(
            "{}://{}:{}{}",
            PLAINTEXT_SCHEME,
            domain,
            port,
            uri.as_deref().unwrap_or_default()
        );
        doc.insert("url.domain", domain);
        doc.insert("url.full", full);
    }
}

/// Host and port from a destination URL or a bare `host[:port]`.
fn parse_destination(destination: &str) -> Option<(String, u16)> {
    let url = if destination.contains("://") {
        Url::parse(destination).ok()?
    } else {
        Url::parse(&format!("{PLAINTEXT_SCHEME}://{destination}")).ok()?
    };
    let domain = url.host_str().filter(|host| !host.is_empty())?.to_string();
    let port = url.port_or_known_default().unwrap_or(DEFAULT_PLAINTEXT_PORT);
    Some((domain, port))
}
