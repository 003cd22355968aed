//! Service instance abstraction.
//!
//! # Responsibilities
//! - Represent a single replica of a service
//! - Carry the weight used by weighted selection
//! - Record the last reported health flag and when it was reported

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::InstanceConfig;

/// A single replica of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInstance {
    /// Identity within the pool; `host:port` unless given explicitly.
    pub id: String,
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub healthy: bool,
    pub registered_at: DateTime<Utc>,
    /// Time of the last `update_instance_health` call.
    pub last_health_check: Option<DateTime<Utc>>,
}

impl ServiceInstance {
    /// Create an instance with weight 1 and id `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            id: format!("{}:{}", host, port),
            host,
            port,
            weight: 1,
            healthy: true,
            registered_at: Utc::now(),
            last_health_check: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// `host:port`, independent of the id.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&InstanceConfig> for ServiceInstance {
    fn from(config: &InstanceConfig) -> Self {
        let instance = ServiceInstance::new(config.host.clone(), config.port).with_weight(config.weight);
        match &config.id {
            Some(id) => instance.with_id(id.clone()),
            None => instance,
        }
    }
}
