//! Access log line parser.
//!
//! Recognizes a fixed set of layouts in priority order (`v1`, `combined`,
//! `common`). A line whose layout matches but whose timestamp is invalid, or
//! which matches no layout at all, is tagged `Malformed` and keeps whatever
//! fields could be recovered. `parse` never fails.

mod tokenizer;
mod types;

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::config::PLACEHOLDER_TOKEN;

pub use tokenizer::{tokenize, Token};
pub use types::{FormatVariant, ParsedLogRecord, RequestLine};

/// `chrono` format of the bracketed timestamp: `[dd/Mon/yyyy:HH:mm:ss ±HHMM]`
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

static V1_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+(?:\.\d+)*$").expect("valid v1 version pattern"));

static HTTP_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z_-]*$").expect("valid HTTP method pattern"));

// chrono alone accepts single-digit days, any month case and `-07:00` offsets
static TIMESTAMP_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{2}/(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}$",
    )
    .expect("valid timestamp pattern")
});

static TLS_PROTOCOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:TLS|SSL)v\d+(?:\.\d+)*$").expect("valid TLS protocol pattern")
});

/// Parses one access log line.
pub fn parse(line: &str) -> ParsedLogRecord {
    let tokens = tokenize(line);

    let matched = parse_v1(&tokens)
        .or_else(|| parse_combined(&tokens))
        .map(finish_layout);

    match matched {
        Some(record) => {
            if record.is_malformed() {
                log::debug!("Access log timestamp failed validation: {}", line);
            }
            record
        }
        None => {
            log::debug!("Access log line matched no known layout: {}", line);
            recover_positional(&tokens)
        }
    }
}

/// Parses the bracketed timestamp. Only the exact
/// `dd/Mon/yyyy:HH:mm:ss ±HHMM` shape is accepted.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if !TIMESTAMP_SHAPE.is_match(value) {
        return None;
    }
    DateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// A layout match before timestamp validation.
struct LayoutMatch {
    record: ParsedLogRecord,
    raw_timestamp: String,
}

/// Validates the timestamp, degrading the record to `Malformed` when it fails.
fn finish_layout(matched: LayoutMatch) -> ParsedLogRecord {
    let LayoutMatch {
        mut record,
        raw_timestamp,
    } = matched;
    match parse_timestamp(&raw_timestamp) {
        Some(ts) => record.timestamp = Some(ts),
        None => record.format_variant = FormatVariant::Malformed,
    }
    record
}

/// Sequential reader over the token list; failed reads do not advance.
struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    fn take<F>(&mut self, f: F) -> Option<&'t str>
    where
        F: Fn(&'t Token<'a>) -> Option<&'t str>,
    {
        let value = self.tokens.get(self.pos).and_then(f)?;
        self.pos += 1;
        Some(value)
    }

    fn bare(&mut self) -> Option<&'t str> {
        self.take(|t| t.as_bare())
    }

    fn quoted(&mut self) -> Option<&'t str> {
        self.take(|t| t.as_quoted())
    }

    fn bracketed(&mut self) -> Option<&'t str> {
        self.take(|t| t.as_bracketed())
    }

    /// Consumes a bare token equal to `word`, ignoring a trailing comma.
    fn keyword(&mut self, word: &str) -> Option<()> {
        self.take(|t| {
            t.as_bare()
                .filter(|s| s.trim_end_matches(',') == word)
        })
        .map(|_| ())
    }

    /// Optional `<ms> ms,` timing. A `-` placeholder is consumed and yields `None`.
    fn timing(&mut self) -> Option<u64> {
        let value = self.take(|t| {
            t.as_bare()
                .filter(|s| is_digits(s) || *s == PLACEHOLDER_TOKEN)
        })?;
        let _ = self.keyword("ms");
        value.parse().ok()
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// `v1.0 20120211 "https://host:443" "1.2.3.4" [ts] "GET / HTTP/1.1" 200 2600 bytes 1112 bytes "ref" "ua" 133 ms, "TLSv1.2" "cipher"`
fn parse_v1(tokens: &[Token<'_>]) -> Option<LayoutMatch> {
    let mut c = Cursor::new(tokens);

    c.take(|t| t.as_bare().filter(|s| V1_VERSION.is_match(s)))?;
    c.take(|t| t.as_bare().filter(|s| is_digits(s)))?;
    let destination = c.quoted()?;
    let client_ip = c.quoted()?;
    let raw_timestamp = c.bracketed()?;
    let request = c.quoted()?;
    let status = status_token(c.bare()?)?;
    let response_bytes = c.bare()?;
    c.keyword("bytes")?;
    let request_bytes = c.bare()?;
    c.keyword("bytes")?;
    let referrer = c.quoted()?;
    let user_agent = c.quoted()?;

    let response_time_ms = c.timing();
    let (tls_protocol, tls_cipher) = read_tls(&mut c);
    if !c.is_done() {
        return None;
    }

    let keep_alive = !is_digits(response_bytes) || !is_digits(request_bytes);
    let mut record = ParsedLogRecord::empty(if keep_alive {
        FormatVariant::V1KeepAlive
    } else {
        FormatVariant::V1
    });
    record.destination = present(destination);
    record.client_ip = present(client_ip);
    record.request_line = Some(RequestLine::parse(request));
    record.status_code = status;
    record.response_bytes = byte_count(response_bytes);
    record.request_bytes = byte_count(request_bytes);
    record.referrer = present(referrer);
    record.user_agent = present(user_agent);
    record.response_time_ms = response_time_ms;
    record.tls_protocol = tls_protocol;
    record.tls_cipher = tls_cipher;

    Some(LayoutMatch {
        record,
        raw_timestamp: raw_timestamp.to_string(),
    })
}

/// `1.2.3.4 - user [ts] "GET / HTTP/1.1" 200 2326 ["ref" "ua" [123 ["TLSv1.2" "cipher"]]]`
fn parse_combined(tokens: &[Token<'_>]) -> Option<LayoutMatch> {
    let mut c = Cursor::new(tokens);

    let client_ip = c.bare()?;
    c.bare()?; // ident
    c.bare()?; // user
    let raw_timestamp = c.bracketed()?;
    let request = c.quoted()?;
    let status = status_token(c.bare()?)?;
    let response_bytes = c.take(|t| {
        t.as_bare()
            .filter(|s| is_digits(s) || *s == PLACEHOLDER_TOKEN)
    })?;

    let mut record = ParsedLogRecord::empty(FormatVariant::Common);
    record.client_ip = present(client_ip);
    record.request_line = Some(RequestLine::parse(request));
    record.status_code = status;
    record.response_bytes = byte_count(response_bytes);

    if !c.is_done() {
        let referrer = c.quoted()?;
        let user_agent = c.quoted()?;
        let response_time_ms = c.timing();
        let (tls_protocol, tls_cipher) = read_tls(&mut c);
        if !c.is_done() {
            return None;
        }

        record.format_variant = FormatVariant::Combined;
        record.referrer = present(referrer);
        record.user_agent = present(user_agent);
        record.response_time_ms = response_time_ms;
        record.tls_protocol = tls_protocol;
        record.tls_cipher = tls_cipher;
    }

    Some(LayoutMatch {
        record,
        raw_timestamp: raw_timestamp.to_string(),
    })
}

/// Optional trailing `"protocol" "cipher"` pair.
fn read_tls(c: &mut Cursor<'_, '_>) -> (Option<String>, Option<String>) {
    let protocol = c.quoted().and_then(present);
    let cipher = c.quoted().and_then(present);
    (protocol, cipher)
}

/// Best-effort extraction from a line that matched no layout.
///
/// Fields are located by shape: the trailing protocol/cipher pair, a URL
/// before the request line, then status, byte counts, referrer, user agent
/// and timing in the order the layouts put them after the request line.
fn recover_positional(tokens: &[Token<'_>]) -> ParsedLogRecord {
    let mut record = ParsedLogRecord::empty(FormatVariant::Malformed);

    record.client_ip = tokens
        .iter()
        .filter(|t| t.as_bracketed().is_none())
        .map(|t| t.text())
        .find(|s| s.parse::<IpAddr>().is_ok())
        .map(str::to_string);

    record.timestamp = tokens
        .iter()
        .filter_map(|t| t.as_bracketed())
        .find_map(parse_timestamp);

    let tail_end = match trailing_tls(tokens) {
        Some((start, protocol, cipher)) => {
            record.tls_protocol = present(protocol);
            record.tls_cipher = present(cipher);
            start
        }
        None => tokens.len(),
    };

    let request = tokens[..tail_end].iter().enumerate().find_map(|(i, t)| {
        let line = RequestLine::parse(t.as_quoted()?);
        let looks_like_request = line.is_complete()
            && line
                .method
                .as_deref()
                .is_some_and(|m| HTTP_METHOD.is_match(m));
        looks_like_request.then_some((i, line))
    });

    let head_end = request.as_ref().map_or(tail_end, |(i, _)| *i);
    record.destination = tokens[..head_end]
        .iter()
        .filter_map(Token::as_quoted)
        .find(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(str::to_string);

    match request {
        Some((i, line)) => {
            record.request_line = Some(line);
            recover_after_request(&mut record, tokens.get(i + 1..tail_end).unwrap_or_default());
        }
        None => {
            record.status_code = tokens[..tail_end]
                .iter()
                .filter_map(Token::as_bare)
                .find_map(|s| status_token(s).flatten());
        }
    }

    record
}

/// `status [bytes [bytes]] ["referrer" "user agent" [ms]]` following the request line.
fn recover_after_request(record: &mut ParsedLogRecord, rest: &[Token<'_>]) {
    let mut pos = 0;
    if let Some(status) = rest.first().and_then(Token::as_bare) {
        record.status_code = status_token(status).flatten();
        pos += 1;
    }

    let counts: Vec<&str> = rest[pos..].iter().map_while(Token::as_bare).collect();
    pos += counts.len();
    let mut counts = counts
        .into_iter()
        .filter(|s| s.trim_end_matches(',') != "bytes");
    record.response_bytes = counts.next().and_then(byte_count);
    record.request_bytes = counts.next().and_then(byte_count);

    let quoted: Vec<&str> = rest[pos..]
        .iter()
        .map_while(Token::as_quoted)
        .take(2)
        .collect();
    pos += quoted.len();
    if let [referrer, user_agent] = quoted.as_slice() {
        record.referrer = present(referrer);
        record.user_agent = present(user_agent);
        record.response_time_ms = rest
            .get(pos)
            .and_then(Token::as_bare)
            .filter(|s| is_digits(s))
            .and_then(|s| s.parse().ok());
    }
}

/// Trailing `"TLSv1.2" "cipher"` pair with its start position.
fn trailing_tls<'t>(tokens: &'t [Token<'_>]) -> Option<(usize, &'t str, &'t str)> {
    let start = tokens.len().checked_sub(2)?;
    let protocol = tokens[start]
        .as_quoted()
        .filter(|s| TLS_PROTOCOL.is_match(s))?;
    let cipher = tokens[start + 1].as_quoted()?;
    Some((start, protocol, cipher))
}

/// Status code token: `Some(Some(code))` for a 3-digit code, `Some(None)` for
/// the placeholder, `None` when the token has the wrong shape.
fn status_token(value: &str) -> Option<Option<u16>> {
    if value == PLACEHOLDER_TOKEN {
        return Some(None);
    }
    if value.len() != 3 || !is_digits(value) {
        return None;
    }
    let code: u16 = value.parse().ok()?;
    (100..=599).contains(&code).then_some(Some(code))
}

/// Numeric byte counts parse; placeholders and anything else stay absent.
fn byte_count(value: &str) -> Option<u64> {
    if is_digits(value) {
        value.parse().ok()
    } else {
        None
    }
}

fn present(value: &str) -> Option<String> {
    if value.is_empty() || value == PLACEHOLDER_TOKEN {
        None
    } else {
        Some(value.to_string())
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
