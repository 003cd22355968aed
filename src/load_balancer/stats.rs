//! Load balancer reports. Building them has no side effects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::load_balancer::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceStats {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub healthy: bool,
    pub active_connections: usize,
    pub registered_at: DateTime<Utc>,
    pub last_health_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub service: String,
    pub default_strategy: Strategy,
    pub total_instances: usize,
    pub healthy_instances: usize,
    pub total_weight: u64,
    pub active_connections: usize,
    pub round_robin_cursor: usize,
    pub instances: Vec<InstanceStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBalancerStats {
    pub total_services: usize,
    pub total_instances: usize,
    pub healthy_instances: usize,
    pub active_connections: usize,
    pub skip_unhealthy: bool,
    pub services: BTreeMap<String, ServiceStats>,
}
