//! Instance pool management.
//!
//! # Responsibilities
//! - Manage one pool of instances per service name
//! - Apply a selection strategy to pick an instance
//! - Track in-flight requests for least-connections selection
//! - Provide connection guards for tracking

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use dashmap::DashMap;

use crate::config::LoadBalancerConfig;
use crate::load_balancer::{
    least_conn::LeastConnections,
    random::Random,
    round_robin::RoundRobin,
    stats::{InstanceStats, LoadBalancerStats, ServiceStats},
    weighted::Weighted,
    ConnectionCounts, Selector, ServiceInstance, Strategy,
};
use crate::observability::metrics;

/// Behavior shared by every pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadBalancerSettings {
    /// Strategy for services without their own default.
    pub default_strategy: Strategy,
    /// When set, instances flagged unhealthy are never selected.
    pub skip_unhealthy: bool,
}

impl From<&LoadBalancerConfig> for LoadBalancerSettings {
    fn from(config: &LoadBalancerConfig) -> Self {
        Self {
            default_strategy: config.default_strategy,
            skip_unhealthy: config.skip_unhealthy,
        }
    }
}

/// The ordered instances of one service plus its round-robin cursor.
#[derive(Debug, Default)]
pub struct InstancePool {
    instances: Vec<ServiceInstance>,
    round_robin: RoundRobin,
    strategy: Option<Strategy>,
}

impl InstancePool {
    pub fn instances(&self) -> &[ServiceInstance] {
        &self.instances
    }

    pub fn contains(&self, id: &str) -> bool {
        self.instances.iter().any(|i| i.id == id)
    }

    fn selector(&self, strategy: Strategy) -> &dyn Selector {
        match strategy {
            Strategy::RoundRobin => &self.round_robin,
            Strategy::Random => &Random,
            Strategy::LeastConnections => &LeastConnections,
            Strategy::Weighted => &Weighted,
        }
    }

    fn select(
        &self,
        strategy: Strategy,
        connections: &ConnectionCounts,
        skip_unhealthy: bool,
    ) -> Option<ServiceInstance> {
        let candidates: Vec<&ServiceInstance> = self
            .instances
            .iter()
            .filter(|i| !skip_unhealthy || i.healthy)
            .collect();

        self.selector(strategy)
            .next_instance(&candidates, connections)
            .cloned()
    }
}

/// Owns one instance pool per service name.
#[derive(Debug)]
pub struct LoadBalancer {
    pools: DashMap<String, InstancePool>,
    connections: ConnectionCounts,
    settings: ArcSwap<LoadBalancerSettings>,
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new(LoadBalancerSettings::default())
    }
}

impl LoadBalancer {
    pub fn new(settings: LoadBalancerSettings) -> Self {
        Self {
            pools: DashMap::new(),
            connections: ConnectionCounts::new(),
            settings: ArcSwap::from_pointee(settings),
        }
    }

    pub fn settings(&self) -> LoadBalancerSettings {
        **self.settings.load()
    }

    pub fn set_settings(&self, settings: LoadBalancerSettings) {
        self.settings.store(Arc::new(settings));
    }

    /// Add `instance` unless its id is already in the service's pool.
    /// Returns whether it was added.
    pub fn register_instance(&self, service: &str, instance: ServiceInstance) -> bool {
        let id = instance.id.clone();
        {
            let mut pool = self.pools.entry(service.to_string()).or_default();
            if pool.contains(&id) {
                tracing::debug!(service = %service, instance = %id, "Instance already registered");
                return false;
            }
            pool.instances.push(instance);
        }
        self.connections.init(&id);

        tracing::info!(service = %service, instance = %id, "Instance registered");
        true
    }

    /// Remove an instance, and its connection count once no pool lists the id.
    /// Returns whether it was present.
    pub fn unregister_instance(&self, service: &str, id: &str) -> bool {
        let removed = match self.pools.get_mut(service) {
            Some(mut pool) => {
                let before = pool.instances.len();
                pool.instances.retain(|i| i.id != id);
                pool.instances.len() != before
            }
            None => false,
        };

        if removed {
            // Counters are shared by id; keep it while another pool still lists the id.
            if !self.pools.iter().any(|pool| pool.contains(id)) {
                self.connections.remove(id);
            }
            tracing::info!(service = %service, instance = %id, "Instance unregistered");
        }
        removed
    }

    /// Set the strategy `get_instance_default` uses for `service`.
    pub fn set_service_strategy(&self, service: &str, strategy: Option<Strategy>) {
        self.pools.entry(service.to_string()).or_default().strategy = strategy;
    }

    /// The strategy `get_instance_default` would use for `service`.
    pub fn service_strategy(&self, service: &str) -> Strategy {
        self.pools
            .get(service)
            .and_then(|pool| pool.strategy)
            .unwrap_or(self.settings().default_strategy)
    }

    /// Select an instance of `service`. `None` for unknown services, empty
    /// pools, or when every instance is filtered out.
    pub fn get_instance(&self, service: &str, strategy: Strategy) -> Option<ServiceInstance> {
        let skip_unhealthy = self.settings().skip_unhealthy;
        let selected = self
            .pools
            .get(service)
            .and_then(|pool| pool.select(strategy, &self.connections, skip_unhealthy));

        match &selected {
            Some(instance) => {
                tracing::debug!(
                    service = %service,
                    strategy = %strategy,
                    instance = %instance.id,
                    "Instance selected"
                );
                metrics::record_instance_selected(service, strategy);
            }
            None => {
                tracing::debug!(service = %service, strategy = %strategy, "No instance available");
                metrics::record_selection_miss(service);
            }
        }
        selected
    }

    /// Select with the service's configured strategy.
    pub fn get_instance_default(&self, service: &str) -> Option<ServiceInstance> {
        self.get_instance(service, self.service_strategy(service))
    }

    /// Select an instance and track a request against it until the guard drops.
    pub fn acquire(&self, service: &str, strategy: Strategy) -> Option<ConnectionGuard<'_>> {
        let instance = self.get_instance(service, strategy)?;
        self.track_request(service, &instance.id);
        Some(ConnectionGuard {
            balancer: self,
            instance,
        })
    }

    /// Count one more in-flight request against an instance of `service`.
    pub fn track_request(&self, service: &str, id: &str) {
        let known = self
            .pools
            .get(service)
            .map(|pool| pool.contains(id))
            .unwrap_or(false);

        if known {
            if self.connections.increment(id).is_none() {
                self.connections.init(id);
                self.connections.increment(id);
            }
        } else {
            tracing::warn!(service = %service, instance = %id, "Tracking request for unknown instance");
        }
    }

    /// Count one fewer in-flight request; never below zero.
    pub fn finish_request(&self, id: &str) {
        if self.connections.decrement(id).is_none() {
            tracing::debug!(instance = %id, "Finished request for untracked instance");
        }
    }

    pub fn connection_count(&self, id: &str) -> Option<usize> {
        self.connections
            .contains(id)
            .then(|| self.connections.get(id))
    }

    /// Record a health flag. Returns false for unknown services or ids.
    pub fn update_instance_health(&self, service: &str, id: &str, healthy: bool) -> bool {
        let Some(mut pool) = self.pools.get_mut(service) else {
            return false;
        };
        let Some(instance) = pool.instances.iter_mut().find(|i| i.id == id) else {
            return false;
        };

        if instance.healthy != healthy {
            tracing::info!(service = %service, instance = %id, healthy, "Instance health changed");
        }
        instance.healthy = healthy;
        instance.last_health_check = Some(Utc::now());
        true
    }

    pub fn instances(&self, service: &str) -> Vec<ServiceInstance> {
        self.pools
            .get(service)
            .map(|pool| pool.instances.clone())
            .unwrap_or_default()
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn build_service_stats(&self, service: &str, pool: &InstancePool) -> ServiceStats {
        let instances: Vec<InstanceStats> = pool
            .instances
            .iter()
            .map(|i| InstanceStats {
                id: i.id.clone(),
                host: i.host.clone(),
                port: i.port,
                weight: i.weight,
                healthy: i.healthy,
                active_connections: self.connections.get(&i.id),
                registered_at: i.registered_at,
                last_health_check: i.last_health_check,
            })
            .collect();

        ServiceStats {
            service: service.to_string(),
            default_strategy: pool.strategy.unwrap_or(self.settings().default_strategy),
            total_instances: instances.len(),
            healthy_instances: instances.iter().filter(|i| i.healthy).count(),
            total_weight: instances.iter().map(|i| u64::from(i.weight)).sum(),
            active_connections: instances.iter().map(|i| i.active_connections).sum(),
            round_robin_cursor: pool.round_robin.cursor(),
            instances,
        }
    }

    pub fn get_service_stats(&self, service: &str) -> Option<ServiceStats> {
        let pool = self.pools.get(service)?;
        Some(self.build_service_stats(service, &pool))
    }

    pub fn get_load_balancer_stats(&self) -> LoadBalancerStats {
        let services: BTreeMap<String, ServiceStats> = self
            .pools
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    self.build_service_stats(entry.key(), entry.value()),
                )
            })
            .collect();

        LoadBalancerStats {
            total_services: services.len(),
            total_instances: services.values().map(|s| s.total_instances).sum(),
            healthy_instances: services.values().map(|s| s.healthy_instances).sum(),
            active_connections: services.values().map(|s| s.active_connections).sum(),
            skip_unhealthy: self.settings().skip_unhealthy,
            services,
        }
    }
}

/// A RAII guard that finishes its tracked request on drop.
#[derive(Debug)]
pub struct ConnectionGuard<'a> {
    balancer: &'a LoadBalancer,
    instance: ServiceInstance,
}

impl Deref for ConnectionGuard<'_> {
    type Target = ServiceInstance;
    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.balancer.finish_request(&self.instance.id);
    }
}
