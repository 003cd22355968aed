//! Builds the registries from configuration and applies reloads.
//!
//! # Responsibilities
//! - Construct the circuit registry and load balancer with configured defaults
//! - Register declared services and their instances
//! - Apply a reloaded configuration on top of the running registries
//!
//! # Design Decisions
//! - The two registries stay independent; this type only holds both
//! - Reload re-registers a circuit only when its effective settings changed, so unchanged
//!   services keep their runtime state
//! - Instances dropped from the file are unregistered; circuits are never removed

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{ResilienceConfig, ServiceConfig};
use crate::load_balancer::{LoadBalancer, LoadBalancerSettings, ServiceInstance};
use crate::resilience::{CircuitOverrides, CircuitRegistry, CircuitSettings};

/// The circuit registry and load balancer, shared by every caller.
#[derive(Debug, Clone)]
pub struct Resilience {
    pub circuits: Arc<CircuitRegistry>,
    pub balancer: Arc<LoadBalancer>,
}

impl Default for Resilience {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

impl Resilience {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let resilience = Self {
            circuits: Arc::new(CircuitRegistry::new(CircuitSettings::from(
                &config.circuit_breaker,
            ))),
            balancer: Arc::new(LoadBalancer::new(LoadBalancerSettings::from(
                &config.load_balancer,
            ))),
        };
        resilience.apply_config(None, config);
        resilience
    }

    /// Bring the registries in line with `next`. `previous` is the
    /// configuration applied last, if any.
    pub fn apply_config(&self, previous: Option<&ResilienceConfig>, next: &ResilienceConfig) {
        self.circuits
            .set_defaults(CircuitSettings::from(&next.circuit_breaker));
        self.balancer
            .set_settings(LoadBalancerSettings::from(&next.load_balancer));

        let previous_defaults = previous.map(|p| CircuitSettings::from(&p.circuit_breaker));
        let next_defaults = CircuitSettings::from(&next.circuit_breaker);
        for service in &next.services {
            let before = previous
                .and_then(|p| find_service(p, &service.name))
                .zip(previous_defaults);
            self.apply_service(before, service, &next_defaults);
        }

        if let Some(previous) = previous {
            for old in &previous.services {
                if find_service(next, &old.name).is_none() {
                    for instance in &old.instances {
                        let id = ServiceInstance::from(instance).id;
                        self.balancer.unregister_instance(&old.name, &id);
                    }
                    self.balancer.set_service_strategy(&old.name, None);
                    tracing::info!(service = %old.name, "Service removed from configuration");
                }
            }
        }

        tracing::info!(services = next.services.len(), "Configuration applied");
    }

    /// `before` pairs the service's previous entry with the defaults it was
    /// applied on top of.
    fn apply_service(
        &self,
        before: Option<(&ServiceConfig, CircuitSettings)>,
        service: &ServiceConfig,
        defaults: &CircuitSettings,
    ) {
        let overrides = CircuitOverrides::from(service);
        let changed = match before {
            Some((old, old_defaults)) => {
                CircuitOverrides::from(old).apply(&old_defaults) != overrides.apply(defaults)
            }
            None => true,
        };
        if changed {
            self.circuits.register_service(&service.name, overrides);
        }
        let before = before.map(|(old, _)| old);

        self.balancer
            .set_service_strategy(&service.name, service.strategy);

        let wanted: HashSet<String> = service
            .instances
            .iter()
            .map(|config| {
                let instance = ServiceInstance::from(config);
                let id = instance.id.clone();
                self.balancer.register_instance(&service.name, instance);
                id
            })
            .collect();

        if let Some(before) = before {
            for config in &before.instances {
                let id = ServiceInstance::from(config).id;
                if !wanted.contains(&id) {
                    self.balancer.unregister_instance(&service.name, &id);
                }
            }
        }
    }
}

fn find_service<'a>(config: &'a ResilienceConfig, name: &str) -> Option<&'a ServiceConfig> {
    config.services.iter().find(|s| s.name == name)
}
