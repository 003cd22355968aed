//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the resilience daemon.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::load_balancer::Strategy;
use crate::resilience::policy::HalfOpenFailurePolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Admin API settings.
    pub admin: AdminConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Defaults applied to every circuit that is not configured explicitly.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Load balancer behavior shared by all pools.
    pub load_balancer: LoadBalancerConfig,

    /// Declaratively registered services and their instances.
    pub services: Vec<ServiceConfig>,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Circuit breaker defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures before the circuit opens.
    pub failure_threshold: u32,

    /// Minimum time a circuit stays open before probing, in seconds.
    pub recovery_timeout_secs: u64,

    /// Successful probes needed to close a half-open circuit.
    pub test_requests: u32,

    /// How failures are judged while half-open.
    pub half_open_failure_policy: HalfOpenFailurePolicy,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            test_requests: 3,
            half_open_failure_policy: HalfOpenFailurePolicy::default(),
        }
    }
}

/// Load balancer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Strategy used when a service does not name one.
    pub default_strategy: Strategy,

    /// Exclude instances flagged unhealthy from selection.
    pub skip_unhealthy: bool,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::RoundRobin,
            skip_unhealthy: false,
        }
    }
}

/// A service registered at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceConfig {
    /// Service name; keys both the circuit and the instance pool.
    pub name: String,

    #[serde(default)]
    pub failure_threshold: Option<u32>,

    #[serde(default)]
    pub recovery_timeout_secs: Option<u64>,

    #[serde(default)]
    pub test_requests: Option<u32>,

    #[serde(default)]
    pub half_open_failure_policy: Option<HalfOpenFailurePolicy>,

    /// Selection strategy for this service's pool.
    #[serde(default)]
    pub strategy: Option<Strategy>,

    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// A single replica of a service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InstanceConfig {
    pub host: String,

    pub port: u16,

    /// Weight for weighted load balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Explicit id; defaults to `host:port`.
    #[serde(default)]
    pub id: Option<String>,
}

fn default_weight() -> u32 {
    1
}
