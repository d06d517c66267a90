//! Retry rounds for store-rejected documents.

use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;

use crate::config::{
    Config, DEFAULT_MAX_RETRY_ROUNDS, RETRY_FACTOR, RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_SECS,
};

/// How many rounds to retry and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rounds after the first write
    pub max_retry_rounds: usize,
    /// Delay before the first retry round in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound of any single delay in seconds
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retry_rounds: DEFAULT_MAX_RETRY_ROUNDS,
            initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            max_delay_secs: RETRY_MAX_DELAY_SECS,
        }
    }
}

impl RetryPolicy {
    /// Retries immediately, for tests and local runs.
    pub fn immediate(max_retry_rounds: usize) -> Self {
        RetryPolicy {
            max_retry_rounds,
            initial_delay_ms: 0,
            max_delay_secs: 0,
        }
    }

    /// Policy from the run configuration.
    pub fn from_config(config: &Config) -> Self {
        RetryPolicy {
            max_retry_rounds: config.max_retry_rounds,
            initial_delay_ms: config.retry_initial_delay_ms,
            max_delay_secs: config.retry_max_delay_secs,
        }
    }

    /// Delay before each retry round.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.initial_delay_ms)
            .factor(RETRY_FACTOR)
            .max_delay(Duration::from_secs(self.max_delay_secs))
            .take(self.max_retry_rounds)
    }
}
