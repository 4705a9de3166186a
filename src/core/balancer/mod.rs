//! Load balancer for candidate ranking
//!
//! Given a service type and a strategy, produces a ranked list of candidate
//! providers rather than a single winner, so the dispatcher can fail over
//! without re-querying. Adaptive strategies consult the stats tracker; the
//! balancer itself owns no mutable state beyond the round-robin cursors.

pub mod strategy;

pub use strategy::Strategy;

use dashmap::DashMap;
use rand::Rng;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use tracing::debug;

use crate::core::registry::ProviderRegistry;
use crate::core::stats::StatsTracker;
use crate::core::types::{Provider, ServiceType};
use crate::utils::error::{GatewayError, Result};

/// Floor applied to average latency when scoring, so a provider whose
/// recorded calls all failed (average latency zero) does not divide by zero.
const LATENCY_FLOOR_SECS: f64 = 1e-3;

/// Ranks eligible providers for a service type according to a strategy
pub struct LoadBalancer {
    registry: Arc<ProviderRegistry>,
    stats: Arc<StatsTracker>,
    strategy: Strategy,
    /// Round-robin cursor per service type; `fetch_add` gives every call a
    /// distinct, incrementing rotation even under concurrency.
    cursors: DashMap<ServiceType, AtomicUsize>,
}

impl LoadBalancer {
    /// Create a balancer with an already-parsed strategy
    pub fn new(
        registry: Arc<ProviderRegistry>,
        stats: Arc<StatsTracker>,
        strategy: Strategy,
    ) -> Self {
        Self {
            registry,
            stats,
            strategy,
            cursors: DashMap::new(),
        }
    }

    /// Create a balancer from a strategy selector string
    ///
    /// A bad selector is a configuration error and fails here, not at
    /// selection time.
    pub fn from_selector(
        registry: Arc<ProviderRegistry>,
        stats: Arc<StatsTracker>,
        selector: &str,
    ) -> Result<Self> {
        Ok(Self::new(registry, stats, selector.parse()?))
    }

    /// Configured strategy
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Produce the ranked candidate list for `service_type`
    ///
    /// `excluded` holds providers already tried within the current dispatch.
    /// Returns [`GatewayError::NoEligible`] when exclusion empties the list.
    pub fn rank(
        &self,
        service_type: ServiceType,
        excluded: &HashSet<String>,
    ) -> Result<Vec<Provider>> {
        let mut candidates = self.registry.list_eligible(service_type)?;
        candidates.retain(|p| !excluded.contains(&p.name));
        if candidates.is_empty() {
            return Err(GatewayError::NoEligible(service_type));
        }

        let ranked = match self.strategy {
            Strategy::RoundRobin => self.rank_round_robin(service_type, candidates),
            Strategy::Weighted => Self::rank_weighted(candidates),
            Strategy::LeastCost => self.rank_least_cost(candidates),
        };

        debug!(
            service_type = %service_type,
            strategy = %self.strategy,
            first = %ranked[0].name,
            candidates = ranked.len(),
            "candidates ranked"
        );
        Ok(ranked)
    }

    /// Rotate the candidate list so the cursor's provider comes first,
    /// remainder in original order; the cursor persists across calls.
    fn rank_round_robin(
        &self,
        service_type: ServiceType,
        mut candidates: Vec<Provider>,
    ) -> Vec<Provider> {
        let offset = {
            let cursor = self
                .cursors
                .entry(service_type)
                .or_insert_with(|| AtomicUsize::new(0));
            cursor.fetch_add(1, Relaxed) % candidates.len()
        };
        candidates.rotate_left(offset);
        candidates
    }

    /// Weighted random draw without replacement: each pass picks one
    /// candidate with probability `weight / remaining_total_weight`.
    fn rank_weighted(mut candidates: Vec<Provider>) -> Vec<Provider> {
        let mut rng = rand::thread_rng();
        let mut ranked = Vec::with_capacity(candidates.len());

        while !candidates.is_empty() {
            // weight > 0 is enforced at registration; max(1) keeps the draw
            // well-defined if a disabled-then-toggled descriptor slips in.
            let total: u64 = candidates.iter().map(|p| u64::from(p.weight.max(1))).sum();
            let mut point = rng.gen_range(0..total);

            let mut picked = candidates.len() - 1;
            for (i, p) in candidates.iter().enumerate() {
                let w = u64::from(p.weight.max(1));
                if point < w {
                    picked = i;
                    break;
                }
                point -= w;
            }
            ranked.push(candidates.remove(picked));
        }
        ranked
    }

    /// Score `success_rate / max(average_latency, floor)` descending.
    /// Providers with no recorded requests rank above every scored one
    /// (explore-first), keeping registration order among themselves.
    fn rank_least_cost(&self, candidates: Vec<Provider>) -> Vec<Provider> {
        let snapshot = self.stats.snapshot();

        let mut unused: Vec<Provider> = Vec::new();
        let mut scored: Vec<(f64, Provider)> = Vec::new();
        for provider in candidates {
            match snapshot.get(&provider.name) {
                Some(stats) if stats.request_count > 0 => {
                    let latency = stats.average_latency.as_secs_f64().max(LATENCY_FLOOR_SECS);
                    scored.push((stats.success_rate / latency, provider));
                }
                _ => unused.push(provider),
            }
        }

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| a.1.priority.cmp(&b.1.priority))
        });

        unused
            .into_iter()
            .chain(scored.into_iter().map(|(_, p)| p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Credential;
    use std::collections::HashMap;
    use std::time::Duration;

    fn provider(name: &str, weight: u32, enabled: bool) -> Provider {
        Provider {
            name: name.to_string(),
            endpoint: format!("https://{name}.example.com"),
            credential: Credential::new("k"),
            capabilities: ["text".to_string()].into_iter().collect(),
            priority: 0,
            weight,
            enabled,
        }
    }

    fn setup(providers: Vec<Provider>, strategy: Strategy) -> (LoadBalancer, Arc<StatsTracker>) {
        let stats = Arc::new(StatsTracker::new());
        let registry = Arc::new(ProviderRegistry::new(stats.clone()));
        registry.register(providers).unwrap();
        (
            LoadBalancer::new(registry, stats.clone(), strategy),
            stats,
        )
    }

    fn names(ranked: &[Provider]) -> Vec<&str> {
        ranked.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_round_robin_rotation_scenario() {
        // Three providers, C disabled: eligible set is [A, B].
        let (balancer, _) = setup(
            vec![
                provider("a", 1, true),
                provider("b", 1, true),
                provider("c", 1, false),
            ],
            Strategy::RoundRobin,
        );

        let excluded = HashSet::new();
        let first = balancer.rank(ServiceType::Text, &excluded).unwrap();
        assert_eq!(names(&first), vec!["a", "b"]);
        let second = balancer.rank(ServiceType::Text, &excluded).unwrap();
        assert_eq!(names(&second), vec!["b", "a"]);
        let third = balancer.rank(ServiceType::Text, &excluded).unwrap();
        assert_eq!(names(&third), vec!["a", "b"]);
    }

    #[test]
    fn test_round_robin_visits_every_provider_once_per_rotation() {
        let (balancer, _) = setup(
            vec![
                provider("a", 1, true),
                provider("b", 1, true),
                provider("c", 1, true),
            ],
            Strategy::RoundRobin,
        );

        let excluded = HashSet::new();
        for _rotation in 0..3 {
            let mut heads = HashSet::new();
            for _ in 0..3 {
                let ranked = balancer.rank(ServiceType::Text, &excluded).unwrap();
                heads.insert(ranked[0].name.clone());
            }
            assert_eq!(heads.len(), 3, "a full rotation visits each provider once");
        }
    }

    #[test]
    fn test_round_robin_cursor_is_per_service_type() {
        let mut a = provider("a", 1, true);
        a.capabilities.insert("image".to_string());
        let mut b = provider("b", 1, true);
        b.capabilities.insert("image".to_string());
        let (balancer, _) = setup(vec![a, b], Strategy::RoundRobin);

        let excluded = HashSet::new();
        let text_first = balancer.rank(ServiceType::Text, &excluded).unwrap();
        // The image cursor has not advanced; it starts from the front.
        let image_first = balancer.rank(ServiceType::Image, &excluded).unwrap();
        assert_eq!(names(&text_first), vec!["a", "b"]);
        assert_eq!(names(&image_first), vec!["a", "b"]);
    }

    #[test]
    fn test_weighted_frequency_converges_to_weight_share() {
        let (balancer, _) = setup(
            vec![provider("heavy", 3, true), provider("light", 1, true)],
            Strategy::Weighted,
        );

        let excluded = HashSet::new();
        let draws = 4000;
        let mut firsts: HashMap<String, u32> = HashMap::new();
        for _ in 0..draws {
            let ranked = balancer.rank(ServiceType::Text, &excluded).unwrap();
            *firsts.entry(ranked[0].name.clone()).or_insert(0) += 1;
        }

        let heavy = f64::from(*firsts.get("heavy").unwrap_or(&0)) / f64::from(draws);
        // Expected share 0.75; allow generous statistical tolerance.
        assert!(
            (heavy - 0.75).abs() < 0.05,
            "heavy selected {heavy} of the time"
        );
        assert!(firsts.contains_key("light"), "light is never starved");
    }

    #[test]
    fn test_weighted_ranking_is_a_permutation() {
        let (balancer, _) = setup(
            vec![
                provider("a", 5, true),
                provider("b", 1, true),
                provider("c", 2, true),
            ],
            Strategy::Weighted,
        );

        let excluded = HashSet::new();
        for _ in 0..50 {
            let ranked = balancer.rank(ServiceType::Text, &excluded).unwrap();
            let mut sorted = names(&ranked);
            sorted.sort_unstable();
            assert_eq!(sorted, vec!["a", "b", "c"], "no duplicates, no drops");
        }
    }

    #[test]
    fn test_weighted_is_not_a_fixed_pick() {
        let (balancer, _) = setup(
            vec![provider("a", 1, true), provider("b", 1, true)],
            Strategy::Weighted,
        );

        let excluded = HashSet::new();
        let mut heads = HashSet::new();
        for _ in 0..200 {
            heads.insert(balancer.rank(ServiceType::Text, &excluded).unwrap()[0]
                .name
                .clone());
        }
        assert_eq!(heads.len(), 2, "both providers must appear first eventually");
    }

    #[test]
    fn test_least_cost_never_used_ranks_above_failed() {
        let (balancer, stats) = setup(
            vec![
                provider("flaky", 1, true),
                provider("fresh", 1, true),
                provider("good", 1, true),
            ],
            Strategy::LeastCost,
        );

        stats.record_failure("flaky");
        stats.record_success("good", Duration::from_millis(50));

        let ranked = balancer.rank(ServiceType::Text, &HashSet::new()).unwrap();
        assert_eq!(ranked[0].name, "fresh", "explore-first beats any history");
        assert_eq!(ranked[1].name, "good");
        assert_eq!(ranked[2].name, "flaky");
    }

    #[test]
    fn test_least_cost_orders_by_score_descending() {
        let (balancer, stats) = setup(
            vec![
                provider("slow", 1, true),
                provider("fast", 1, true),
            ],
            Strategy::LeastCost,
        );

        stats.record_success("slow", Duration::from_millis(800));
        stats.record_success("fast", Duration::from_millis(40));

        let ranked = balancer.rank(ServiceType::Text, &HashSet::new()).unwrap();
        assert_eq!(names(&ranked), vec!["fast", "slow"]);
    }

    #[test]
    fn test_least_cost_unused_keep_registration_order() {
        let (balancer, _) = setup(
            vec![
                provider("first", 1, true),
                provider("second", 1, true),
                provider("third", 1, true),
            ],
            Strategy::LeastCost,
        );

        let ranked = balancer.rank(ServiceType::Text, &HashSet::new()).unwrap();
        assert_eq!(names(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_least_cost_all_failures_does_not_divide_by_zero() {
        let (balancer, stats) = setup(
            vec![provider("broken", 1, true), provider("ok", 1, true)],
            Strategy::LeastCost,
        );

        // Only failures recorded: average latency stays zero, score uses
        // the floor instead of dividing by zero.
        stats.record_failure("broken");
        stats.record_success("ok", Duration::from_millis(100));

        let ranked = balancer.rank(ServiceType::Text, &HashSet::new()).unwrap();
        assert_eq!(ranked[0].name, "ok");
    }

    #[test]
    fn test_exclusion_empties_candidates() {
        let (balancer, _) = setup(
            vec![provider("a", 1, true), provider("b", 1, true)],
            Strategy::RoundRobin,
        );

        let excluded: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            balancer.rank(ServiceType::Text, &excluded),
            Err(GatewayError::NoEligible(ServiceType::Text))
        ));
    }

    #[test]
    fn test_from_selector_rejects_unknown_strategy() {
        let stats = Arc::new(StatsTracker::new());
        let registry = Arc::new(ProviderRegistry::new(stats.clone()));
        let result = LoadBalancer::from_selector(registry, stats, "sticky");
        assert!(matches!(result, Err(GatewayError::UnknownStrategy(_))));
    }
}
