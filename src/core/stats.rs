//! Per-provider rolling statistics
//!
//! One [`ProviderStats`] record per provider, owned by [`StatsTracker`] and
//! mutated only through its synchronized API. All fields of a record update
//! together under one critical section, so a snapshot never exposes a
//! partially updated entry.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::core::types::Outcome;

/// Rolling counters for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    /// Completed calls, success or failure
    pub request_count: u64,
    /// Failed calls
    pub error_count: u64,
    /// `(request_count - error_count) / request_count`, 1.0 before any call
    pub success_rate: f64,
    /// Cumulative mean latency of successful calls
    pub average_latency: Duration,
    /// Timestamp of the most recent completed call
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Default for ProviderStats {
    fn default() -> Self {
        Self {
            request_count: 0,
            error_count: 0,
            // A provider with no history is treated as perfectly reliable
            // until proven otherwise.
            success_rate: 1.0,
            average_latency: Duration::ZERO,
            last_used_at: None,
        }
    }
}

impl ProviderStats {
    fn recompute_rate(&mut self) {
        if self.request_count == 0 {
            self.success_rate = 1.0;
        } else {
            self.success_rate =
                (self.request_count - self.error_count) as f64 / self.request_count as f64;
        }
    }
}

/// Thread-safe mapping from provider name to [`ProviderStats`]
///
/// Entries are created when a provider is registered and retained when it is
/// removed, so a benign config reload does not lose telemetry. Updates for
/// unknown names are a no-op: a stats update racing a registry swap must not
/// panic or create orphan entries.
#[derive(Default)]
pub struct StatsTracker {
    inner: RwLock<HashMap<String, ProviderStats>>,
}

impl StatsTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zeroed entry for `name` if none exists
    pub fn ensure(&self, name: &str) {
        self.inner
            .write()
            .entry(name.to_string())
            .or_default();
    }

    /// Record a successful call
    pub fn record_success(&self, name: &str, latency: Duration) {
        let mut inner = self.inner.write();
        let Some(stats) = inner.get_mut(name) else {
            debug!(provider = name, "success for unknown provider, ignored");
            return;
        };
        stats.request_count += 1;
        let n = stats.request_count;
        // Incremental cumulative mean over successful samples only.
        let total = stats.average_latency.as_secs_f64() * (n - 1) as f64 + latency.as_secs_f64();
        stats.average_latency = Duration::from_secs_f64(total / n as f64);
        stats.recompute_rate();
        stats.last_used_at = Some(Utc::now());
    }

    /// Record a failed call
    ///
    /// Latency is not folded into the average: a failed call does not
    /// represent useful-work time.
    pub fn record_failure(&self, name: &str) {
        let mut inner = self.inner.write();
        let Some(stats) = inner.get_mut(name) else {
            debug!(provider = name, "failure for unknown provider, ignored");
            return;
        };
        stats.request_count += 1;
        stats.error_count += 1;
        stats.recompute_rate();
        stats.last_used_at = Some(Utc::now());
    }

    /// Record an adapter-call outcome
    pub fn record(&self, outcome: &Outcome) {
        if outcome.succeeded {
            self.record_success(&outcome.provider, outcome.latency);
        } else {
            self.record_failure(&outcome.provider);
        }
    }

    /// Deep copy of all records for external reporting
    pub fn snapshot(&self) -> HashMap<String, ProviderStats> {
        self.inner.read().clone()
    }

    /// Current record for one provider
    pub fn get(&self, name: &str) -> Option<ProviderStats> {
        self.inner.read().get(name).cloned()
    }
}
