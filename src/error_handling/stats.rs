//! Ingestion statistics tracking.
//!
//! Counters for one batch invocation. Atomic so a handler can be shared
//! behind an `Arc` without extra locking.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::IngestMetric;

/// Thread-safe ingestion statistics tracker.
///
/// Every `IngestMetric` variant is initialized to zero on creation.
pub struct IngestStats {
    counters: HashMap<IngestMetric, AtomicUsize>,
}

impl IngestStats {
    /// Creates a tracker with every counter at zero.
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for metric in IngestMetric::iter() {
            counters.insert(metric, AtomicUsize::new(0));
        }
        IngestStats { counters }
    }

    /// Increment a counter by one.
    pub fn increment(&self, metric: IngestMetric) {
        self.add(metric, 1);
    }

    /// Increment a counter by `amount`.
    pub fn add(&self, metric: IngestMetric, amount: usize) {
        if let Some(counter) = self.counters.get(&metric) {
            counter.fetch_add(amount, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in IngestStats initialization.",
                metric
            );
        }
    }

    /// Get the count for a metric.
    pub fn get(&self, metric: IngestMetric) -> usize {
        self.counters
            .get(&metric)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Point-in-time copy of all counters, ordered by metric name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, usize> {
        IngestMetric::iter()
            .map(|metric| (metric.as_str(), self.get(metric)))
            .collect()
    }

    /// Logs every non-zero counter at info level.
    pub fn log_summary(&self) {
        for metric in IngestMetric::iter() {
            let count = self.get(metric);
            if count > 0 {
                log::info!("{}: {}", metric, count);
            }
        }
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}
