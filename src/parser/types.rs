//! Parsed access log record types.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use strum_macros::{AsRefStr, EnumIter};

/// Which known layout a line matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormatVariant {
    /// Versioned layout with destination, byte counts, timing and optional TLS tokens
    V1,
    /// `V1` layout where a byte count is the `-` placeholder
    V1KeepAlive,
    /// Apache combined layout, optionally followed by timing and TLS tokens
    Combined,
    /// Apache common layout
    Common,
    /// No layout matched, or the timestamp failed validation
    Malformed,
}

/// The quoted request line, split when it has the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestLine {
    /// Request line exactly as logged
    pub raw: String,
    /// Method, e.g. `GET`
    pub method: Option<String>,
    /// Path with the query string kept verbatim
    pub path: Option<String>,
    /// Protocol and version, e.g. `HTTP/1.1`
    pub protocol: Option<String>,
}

impl RequestLine {
    /// Splits `raw` into method, path and protocol.
    ///
    /// Anything other than exactly three space-separated parts leaves the
    /// parts absent and keeps only `raw`.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(' ').collect();
        match parts.as_slice() {
            [method, path, protocol]
                if !method.is_empty() && !path.is_empty() && !protocol.is_empty() =>
            {
                RequestLine {
                    raw: raw.to_string(),
                    method: Some(method.to_string()),
                    path: Some(path.to_string()),
                    protocol: Some(protocol.to_string()),
                }
            }
            _ => RequestLine {
                raw: raw.to_string(),
                method: None,
                path: None,
                protocol: None,
            },
        }
    }

    /// Version number without the `HTTP/` prefix.
    pub fn version(&self) -> Option<&str> {
        self.protocol
            .as_deref()
            .map(|p| p.split_once('/').map_or(p, |(_, version)| version))
    }

    /// True when the line split into method, path and protocol.
    pub fn is_complete(&self) -> bool {
        self.method.is_some() && self.path.is_some() && self.protocol.is_some()
    }
}

/// Structured result of parsing one log line.
///
/// A `Malformed` record still carries every field that could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedLogRecord {
    /// Layout the line matched
    pub format_variant: FormatVariant,
    /// Client address as logged
    pub client_ip: Option<String>,
    /// Request time with its logged offset; absent when invalid
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Quoted request line
    pub request_line: Option<RequestLine>,
    /// HTTP status; absent for the `-` placeholder
    pub status_code: Option<u16>,
    /// Response size; absent for the placeholder
    pub response_bytes: Option<u64>,
    /// Request size, logged by the `v1` layouts only
    pub request_bytes: Option<u64>,
    /// Referrer URL
    pub referrer: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Time taken to serve the request in milliseconds
    pub response_time_ms: Option<u64>,
    /// Protocol token such as `TLSv1.2`
    pub tls_protocol: Option<String>,
    /// Negotiated cipher suite
    pub tls_cipher: Option<String>,
    /// Virtual host URL the request was addressed to, e.g. `https://host:443`
    pub destination: Option<String>,
}

impl ParsedLogRecord {
    /// Empty record of the given variant.
    pub fn empty(format_variant: FormatVariant) -> Self {
        ParsedLogRecord {
            format_variant,
            client_ip: None,
            timestamp: None,
            request_line: None,
            status_code: None,
            response_bytes: None,
            request_bytes: None,
            referrer: None,
            user_agent: None,
            response_time_ms: None,
            tls_protocol: None,
            tls_cipher: None,
            destination: None,
        }
    }

    /// TLS traffic is recognized only by the trailing protocol/cipher tokens.
    pub fn is_tls(&self) -> bool {
        self.tls_protocol.is_some() || self.tls_cipher.is_some()
    }

    /// True when no layout matched or the timestamp failed validation.
    pub fn is_malformed(&self) -> bool {
        self.format_variant == FormatVariant::Malformed
    }

    /// Sets `destination` from a fallback when the line did not carry one.
    pub fn with_default_destination(mut self, fallback: Option<String>) -> Self {
        if self.destination.is_none() {
            self.destination = fallback;
        }
        self
    }
}
