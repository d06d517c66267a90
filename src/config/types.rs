//! Configuration types and CLI options.
//!
//! `Config` is the library-facing configuration and can be built without any
//! CLI dependencies. `Opt` is the `clap` front end used by the binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_INDEX_DATE_FORMAT, DEFAULT_INDEX_PREFIX, DEFAULT_MAX_RETRY_ROUNDS, DEFAULT_REGION,
    DEFAULT_SIGNING_SERVICE, HTTP_TIMEOUT_SECS, RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_SECS,
    TRANSPORT_MAX_ATTEMPTS,
};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use access_log_ingest::Config;
///
/// let config = Config {
///     endpoint: Some("https://search.example.com".to_string()),
///     max_retry_rounds: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Stream event JSON file (`-` reads stdin)
    pub input: PathBuf,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Base URL of the search store (the `_bulk` path is appended)
    pub endpoint: Option<String>,

    /// Sign bulk requests with AWS SigV4
    pub sign_requests: bool,

    /// AWS region used for signing
    pub region: String,

    /// AWS service name used for signing
    pub signing_service: String,

    /// Index name prefix
    pub index_prefix: String,

    /// `chrono` format string for the date partition of the index name
    pub index_date_format: String,

    /// Retry rounds after the first bulk write
    pub max_retry_rounds: usize,

    /// Initial delay between retry rounds in milliseconds
    pub retry_initial_delay_ms: u64,

    /// Maximum delay between retry rounds in seconds
    pub retry_max_delay_secs: u64,

    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,

    /// Transport-level attempts per bulk request
    pub transport_attempts: usize,

    /// GeoLite2-City database path
    pub geoip_city: Option<PathBuf>,

    /// GeoLite2-ASN database path
    pub geoip_asn: Option<PathBuf>,

    /// Print transformed documents instead of writing them
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("-"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            endpoint: None,
            sign_requests: true,
            region: DEFAULT_REGION.to_string(),
            signing_service: DEFAULT_SIGNING_SERVICE.to_string(),
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            index_date_format: DEFAULT_INDEX_DATE_FORMAT.to_string(),
            max_retry_rounds: DEFAULT_MAX_RETRY_ROUNDS,
            retry_initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            retry_max_delay_secs: RETRY_MAX_DELAY_SECS,
            timeout_seconds: HTTP_TIMEOUT_SECS,
            transport_attempts: TRANSPORT_MAX_ATTEMPTS,
            geoip_city: None,
            geoip_asn: None,
            dry_run: false,
        }
    }
}

/// Command-line options for the `access_log_ingest` binary.
#[derive(Debug, Parser)]
#[command(
    name = "access_log_ingest",
    about = "Parse, enrich and bulk-index a batch of access-log stream records"
)]
pub struct Opt {
    /// Stream event JSON file (`-` reads stdin)
    #[arg(long, short, default_value = "-")]
    pub input: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Base URL of the search store
    #[arg(long, env = "BULK_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Send unsigned requests (local clusters)
    #[arg(long)]
    pub no_sign: bool,

    /// AWS region used for signing
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// AWS service name used for signing
    #[arg(long, default_value = DEFAULT_SIGNING_SERVICE)]
    pub signing_service: String,

    /// Index name prefix
    #[arg(long, default_value = DEFAULT_INDEX_PREFIX)]
    pub index_prefix: String,

    /// Date format of the index partition
    #[arg(long, default_value = DEFAULT_INDEX_DATE_FORMAT)]
    pub index_date_format: String,

    /// Retry rounds after the first bulk write
    #[arg(long, default_value_t = DEFAULT_MAX_RETRY_ROUNDS)]
    pub max_retry_rounds: usize,

    /// Initial delay between retry rounds (milliseconds)
    #[arg(long, default_value_t = RETRY_INITIAL_DELAY_MS)]
    pub retry_initial_delay_ms: u64,

    /// Maximum delay between retry rounds (seconds)
    #[arg(long, default_value_t = RETRY_MAX_DELAY_SECS)]
    pub retry_max_delay_secs: u64,

    /// HTTP request timeout (seconds)
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Transport-level attempts per bulk request
    #[arg(long, default_value_t = TRANSPORT_MAX_ATTEMPTS)]
    pub transport_attempts: usize,

    /// GeoLite2-City database (.mmdb)
    #[arg(long, env = "GEOIP_CITY_DB")]
    pub geoip_city: Option<PathBuf>,

    /// GeoLite2-ASN database (.mmdb)
    #[arg(long, env = "GEOIP_ASN_DB")]
    pub geoip_asn: Option<PathBuf>,

    /// Print transformed documents as JSON lines instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

impl From<Opt> for Config {
    fn from(opt: Opt) -> Self {
        Self {
            input: opt.input,
            log_level: opt.log_level,
            log_format: opt.log_format,
            endpoint: opt.endpoint,
            sign_requests: !opt.no_sign,
            region: opt.region,
            signing_service: opt.signing_service,
            index_prefix: opt.index_prefix,
            index_date_format: opt.index_date_format,
            max_retry_rounds: opt.max_retry_rounds,
            retry_initial_delay_ms: opt.retry_initial_delay_ms,
            retry_max_delay_secs: opt.retry_max_delay_secs,
            timeout_seconds: opt.timeout_seconds,
            transport_attempts: opt.transport_attempts,
            geoip_city: opt.geoip_city,
            geoip_asn: opt.geoip_asn,
            dry_run: opt.dry_run,
        }
    }
}
