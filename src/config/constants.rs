//! Configuration constants.
//!
//! Defaults for retry behaviour, index routing and the log-format details the
//! parser and transformer share.

/// Maximum number of retry rounds after the first bulk write.
///
/// Each round resubmits only the documents that are still failing, so the total
/// number of bulk writes per batch is at most `DEFAULT_MAX_RETRY_ROUNDS + 1`.
pub const DEFAULT_MAX_RETRY_ROUNDS: usize = 3;

/// Initial delay in milliseconds before the first retry round
pub const RETRY_INITIAL_DELAY_MS: u64 = 200;
/// Factor by which the retry delay is multiplied on each round
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retry rounds in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 5;

/// Transport-level attempts for a single bulk request (connect/timeout failures only)
pub const TRANSPORT_MAX_ATTEMPTS: usize = 3;
/// Initial backoff between transport attempts in milliseconds
pub const TRANSPORT_RETRY_INITIAL_DELAY_MS: u64 = 100;
/// HTTP request timeout in seconds
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default index name prefix
pub const DEFAULT_INDEX_PREFIX: &str = "access-logs";
/// Default `chrono` format for the date partition of the index name
pub const DEFAULT_INDEX_DATE_FORMAT: &str = "%Y.%m.%d";
/// Index suffix used when a record carries no parseable timestamp
pub const FALLBACK_INDEX_SUFFIX: &str = "unparsed";

/// Token used by the access log format when a value is not available
pub const PLACEHOLDER_TOKEN: &str = "-";
/// Port reported for plaintext traffic when the destination does not name one
pub const DEFAULT_PLAINTEXT_PORT: u16 = 80;
/// Scheme reported for plaintext traffic
pub const PLAINTEXT_SCHEME: &str = "http";

/// Number of random bytes used for a document identifier
pub const DOCUMENT_ID_BYTES: usize = 16;

/// Default AWS service name used when signing bulk requests
pub const DEFAULT_SIGNING_SERVICE: &str = "es";
/// Default AWS region used when signing bulk requests
pub const DEFAULT_REGION: &str = "ca-central-1";

// Environment variables
/// Access key id for request signing
pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
/// Secret access key for request signing
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
/// Optional session token for temporary credentials
pub const AWS_SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
