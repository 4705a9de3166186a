//! Dispatch-with-failover orchestration
//!
//! Turns a ranked candidate list into exactly one successful adapter
//! invocation, or an aggregated failure. After each failed attempt the
//! candidate list is re-ranked with the failed provider excluded, so
//! adaptive strategies react to the freshly recorded failure within the
//! same request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::adapter::{AdapterError, AdapterRegistry};
use crate::core::balancer::LoadBalancer;
use crate::core::stats::StatsTracker;
use crate::core::types::{GenericRequest, GenericResult, Outcome, ServiceType};
use crate::utils::error::{GatewayError, Result};

/// Dispatcher tuning knobs
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Maximum distinct providers tried per request; `None` means try every
    /// eligible provider once before giving up
    pub max_attempts: Option<usize>,
    /// Wall-clock budget for one `execute` call, covering all failover
    /// attempts; `None` means no deadline
    pub request_timeout: Option<Duration>,
}

/// Orchestrates rank → invoke → record → failover
pub struct Dispatcher {
    balancer: Arc<LoadBalancer>,
    stats: Arc<StatsTracker>,
    adapters: Arc<AdapterRegistry>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher over an already-wired balancer and adapter registry
    pub fn new(
        balancer: Arc<LoadBalancer>,
        stats: Arc<StatsTracker>,
        adapters: Arc<AdapterRegistry>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            balancer,
            stats,
            adapters,
            config,
        }
    }

    /// Execute a generic request against the best available provider
    ///
    /// Iterates ranked candidates, failing over on any adapter error until a
    /// provider succeeds, the attempt budget is spent, or the deadline
    /// expires. A failing provider is excluded for the remainder of this
    /// request only. The caller sees a successful result or one aggregated
    /// error, never intermediate per-provider failures.
    pub async fn execute(
        &self,
        service_type: ServiceType,
        request: &GenericRequest,
    ) -> Result<GenericResult> {
        let request_id = Uuid::new_v4();
        let deadline = self.config.request_timeout.map(|t| Instant::now() + t);

        let mut excluded: HashSet<String> = HashSet::new();
        let mut attempts: Vec<(String, AdapterError)> = Vec::new();

        // The first ranking also fixes the default attempt budget: try every
        // initially-eligible provider once.
        let mut ranked = self.balancer.rank(service_type, &excluded)?;
        let budget = self.config.max_attempts.unwrap_or(ranked.len()).max(1);

        loop {
            let Some(provider) = ranked.into_iter().next() else {
                break;
            };

            debug!(
                %request_id,
                provider = %provider.name,
                service_type = %service_type,
                attempt = attempts.len() + 1,
                "invoking adapter"
            );

            let Some(adapter) = self.adapters.get(&provider.name, service_type) else {
                // Treated as a permanent per-provider failure; failover
                // continues so a misconfigured fleet still degrades softly.
                warn!(
                    %request_id,
                    provider = %provider.name,
                    service_type = %service_type,
                    "no adapter registered for provider"
                );
                self.stats.record_failure(&provider.name);
                attempts.push((
                    provider.name.clone(),
                    AdapterError::permanent("no adapter registered for provider/service pair"),
                ));
                excluded.insert(provider.name);
                match self.next_candidates(service_type, &excluded, attempts.len(), budget)? {
                    Some(next) => {
                        ranked = next;
                        continue;
                    }
                    None => break,
                }
            };

            // Latency measurement brackets exactly the adapter call;
            // ranking and bookkeeping time is excluded.
            let started = Instant::now();
            let outcome = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(started);
                    if remaining.is_zero() {
                        return Err(GatewayError::DeadlineExceeded);
                    }
                    match tokio::time::timeout(remaining, adapter.invoke(service_type, request))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => {
                            // The in-flight provider burned the rest of the
                            // budget; remaining candidates are abandoned.
                            let latency = started.elapsed();
                            self.stats.record(&Outcome::failure(
                                &provider.name,
                                latency,
                                "request deadline exceeded",
                            ));
                            warn!(
                                %request_id,
                                provider = %provider.name,
                                latency_ms = latency.as_millis() as u64,
                                "deadline expired mid-call"
                            );
                            return Err(GatewayError::DeadlineExceeded);
                        }
                    }
                }
                None => adapter.invoke(service_type, request).await,
            };
            let latency = started.elapsed();

            match outcome {
                Ok(mut result) => {
                    self.stats
                        .record(&Outcome::success(&provider.name, latency));
                    info!(
                        %request_id,
                        provider = %provider.name,
                        service_type = %service_type,
                        latency_ms = latency.as_millis() as u64,
                        attempts = attempts.len() + 1,
                        "request served"
                    );
                    result.provider = provider.name;
                    result.latency = latency;
                    return Ok(result);
                }
                Err(err) => {
                    self.stats.record(&Outcome::failure(
                        &provider.name,
                        latency,
                        err.to_string(),
                    ));
                    warn!(
                        %request_id,
                        provider = %provider.name,
                        transient = err.is_transient(),
                        error = %err,
                        "provider call failed, failing over"
                    );
                    attempts.push((provider.name.clone(), err));
                    excluded.insert(provider.name);
                    match self.next_candidates(service_type, &excluded, attempts.len(), budget)? {
                        Some(next) => ranked = next,
                        None => break,
                    }
                }
            }
        }

        Err(GatewayError::AllProvidersFailed {
            service_type,
            attempts,
        })
    }

    /// Re-rank after a failure, or signal exhaustion
    ///
    /// Returns `Ok(None)` when the attempt budget is spent or no candidate
    /// remains after exclusion; either way the caller aggregates the
    /// per-provider errors collected so far.
    fn next_candidates(
        &self,
        service_type: ServiceType,
        excluded: &HashSet<String>,
        attempts_so_far: usize,
        budget: usize,
    ) -> Result<Option<Vec<crate::core::types::Provider>>> {
        if attempts_so_far >= budget {
            return Ok(None);
        }
        match self.balancer.rank(service_type, excluded) {
            Ok(ranked) => Ok(Some(ranked)),
            Err(GatewayError::NoEligible(_)) | Err(GatewayError::NoProviders) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
