//! Provider registry
//!
//! Owns the active provider set. Replacement is an atomic all-or-nothing
//! swap (`arc-swap`), so concurrent readers observe either the old or the
//! new complete set, never a mix.

use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::stats::StatsTracker;
use crate::core::types::{Provider, ServiceType};
use crate::utils::error::{GatewayError, Result};

/// Holds the set of configured providers and their capabilities
pub struct ProviderRegistry {
    active: ArcSwap<Vec<Provider>>,
    stats: Arc<StatsTracker>,
}

impl ProviderRegistry {
    /// Create an empty registry wired to a stats tracker
    pub fn new(stats: Arc<StatsTracker>) -> Self {
        Self {
            active: ArcSwap::from_pointee(Vec::new()),
            stats,
        }
    }

    /// Replace the active provider set atomically
    ///
    /// Every provider not previously known gets a fresh zeroed stats entry.
    /// Providers dropped from the new set keep their stats entries, so a
    /// benign config reload does not lose telemetry. Registering an empty
    /// list is valid; the empty fleet is reported at selection time.
    pub fn register(&self, providers: Vec<Provider>) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(providers.len());
        for provider in &providers {
            if provider.enabled && provider.weight == 0 {
                return Err(GatewayError::InvalidProvider {
                    name: provider.name.clone(),
                    reason: "enabled provider must have weight > 0".to_string(),
                });
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(GatewayError::InvalidProvider {
                    name: provider.name.clone(),
                    reason: "duplicate provider name".to_string(),
                });
            }
        }

        for provider in &providers {
            self.stats.ensure(&provider.name);
        }

        let count = providers.len();
        self.active.store(Arc::new(providers));
        info!(count, "provider registry replaced");
        Ok(())
    }

    /// Enabled providers serving `service_type`, in registration order
    ///
    /// Returns [`GatewayError::NoProviders`] when the active set is empty.
    pub fn list_eligible(&self, service_type: ServiceType) -> Result<Vec<Provider>> {
        let active = self.active.load();
        if active.is_empty() {
            return Err(GatewayError::NoProviders);
        }

        let eligible: Vec<Provider> = active
            .iter()
            .filter(|p| p.enabled && p.serves(service_type))
            .cloned()
            .collect();
        debug!(
            service_type = %service_type,
            eligible = eligible.len(),
            "capability filter applied"
        );
        Ok(eligible)
    }

    /// Snapshot of the active provider set, in registration order
    pub fn providers(&self) -> Vec<Provider> {
        self.active.load().as_ref().clone()
    }

    /// Number of active providers
    pub fn len(&self) -> usize {
        self.active.load().len()
    }

    /// Whether the active set is empty
    pub fn is_empty(&self) -> bool {
        self.active.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Credential;
    use std::time::Duration;

    fn provider(name: &str, caps: &[&str], enabled: bool) -> Provider {
        Provider {
            name: name.to_string(),
            endpoint: format!("https://{name}.example.com"),
            credential: Credential::new("k"),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            priority: 0,
            weight: 1,
            enabled,
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(StatsTracker::new()))
    }

    #[test]
    fn test_register_seeds_stats_entries() {
        let stats = Arc::new(StatsTracker::new());
        let registry = ProviderRegistry::new(stats.clone());
        registry
            .register(vec![provider("a", &["text"], true)])
            .unwrap();

        assert!(stats.get("a").is_some());
        assert_eq!(stats.get("a").unwrap().request_count, 0);
    }

    #[test]
    fn test_swap_retains_stats_of_removed_providers() {
        let stats = Arc::new(StatsTracker::new());
        let registry = ProviderRegistry::new(stats.clone());
        registry
            .register(vec![provider("a", &["text"], true)])
            .unwrap();
        stats.record_success("a", Duration::from_millis(20));

        registry
            .register(vec![provider("b", &["text"], true)])
            .unwrap();

        // "a" is gone from the fleet but its telemetry survives.
        assert_eq!(registry.len(), 1);
        assert_eq!(stats.get("a").unwrap().request_count, 1);
        assert!(stats.get("b").is_some());
    }

    #[test]
    fn test_list_eligible_filters_disabled_and_capability() {
        let registry = registry();
        registry
            .register(vec![
                provider("a", &["text", "image"], true),
                provider("b", &["text"], true),
                provider("c", &["text"], false),
                provider("d", &["tts"], true),
            ])
            .unwrap();

        let eligible = registry.list_eligible(ServiceType::Text).unwrap();
        let names: Vec<&str> = eligible.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_list_eligible_honors_wildcard() {
        let registry = registry();
        registry
            .register(vec![provider("any", &["all"], true)])
            .unwrap();

        assert_eq!(registry.list_eligible(ServiceType::Tts).unwrap().len(), 1);
        assert_eq!(registry.list_eligible(ServiceType::Image).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_fleet_reported_at_selection_time() {
        let registry = registry();
        // Registering an empty list is not an error...
        registry.register(Vec::new()).unwrap();
        // ...but selection against the empty fleet is.
        assert!(matches!(
            registry.list_eligible(ServiceType::Text),
            Err(GatewayError::NoProviders)
        ));
    }

    #[test]
    fn test_no_capability_match_is_empty_not_error() {
        let registry = registry();
        registry
            .register(vec![provider("a", &["text"], true)])
            .unwrap();

        let eligible = registry.list_eligible(ServiceType::Tts).unwrap();
        assert!(eligible.is_empty());
    }

    #[test]
    fn test_enabled_provider_with_zero_weight_rejected() {
        let registry = registry();
        let mut p = provider("a", &["text"], true);
        p.weight = 0;
        assert!(matches!(
            registry.register(vec![p]),
            Err(GatewayError::InvalidProvider { .. })
        ));

        // A disabled provider may carry weight 0.
        let mut p = provider("a", &["text"], false);
        p.weight = 0;
        registry.register(vec![p]).unwrap();
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let registry = registry();
        let result = registry.register(vec![
            provider("a", &["text"], true),
            provider("a", &["image"], true),
        ]);
        assert!(matches!(
            result,
            Err(GatewayError::InvalidProvider { .. })
        ));
        // The failed swap must not have replaced the active set.
        assert!(registry.is_empty());
    }
}
