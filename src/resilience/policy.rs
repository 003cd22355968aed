//! Circuit settings and the half-open failure policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{CircuitBreakerConfig, ServiceConfig};

/// How a failure recorded while half-open is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalfOpenFailurePolicy {
    /// Reopen only once the failure count, carried over from before the circuit
    /// opened, is again at or above the threshold.
    #[default]
    Cumulative,
    /// Reopen on the first failed probe.
    ReopenImmediately,
}

impl HalfOpenFailurePolicy {
    /// Whether a half-open circuit holding `failure_count` failures should reopen.
    pub fn should_reopen(self, failure_count: u32, failure_threshold: u32) -> bool {
        match self {
            HalfOpenFailurePolicy::Cumulative => failure_count >= failure_threshold,
            HalfOpenFailurePolicy::ReopenImmediately => true,
        }
    }
}

/// Effective configuration of one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSettings {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// Successful probes required to close a half-open circuit; also caps
    /// how many probes are admitted.
    pub test_requests: u32,
    pub half_open_failure_policy: HalfOpenFailurePolicy,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            test_requests: 3,
            half_open_failure_policy: HalfOpenFailurePolicy::Cumulative,
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout: Duration::from_secs(config.recovery_timeout_secs),
            test_requests: config.test_requests,
            half_open_failure_policy: config.half_open_failure_policy,
        }
    }
}

/// Partial settings supplied to `register_service`; unset fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitOverrides {
    pub failure_threshold: Option<u32>,
    pub recovery_timeout: Option<Duration>,
    pub test_requests: Option<u32>,
    pub half_open_failure_policy: Option<HalfOpenFailurePolicy>,
}

impl CircuitOverrides {
    pub fn failure_threshold(mut self, value: u32) -> Self {
        self.failure_threshold = Some(value);
        self
    }

    pub fn recovery_timeout(mut self, value: Duration) -> Self {
        self.recovery_timeout = Some(value);
        self
    }

    pub fn test_requests(mut self, value: u32) -> Self {
        self.test_requests = Some(value);
        self
    }

    pub fn half_open_failure_policy(mut self, value: HalfOpenFailurePolicy) -> Self {
        self.half_open_failure_policy = Some(value);
        self
    }

    /// Merge onto `base`, with overrides taking precedence.
    pub fn apply(&self, base: &CircuitSettings) -> CircuitSettings {
        CircuitSettings {
            failure_threshold: self.failure_threshold.unwrap_or(base.failure_threshold),
            recovery_timeout: self.recovery_timeout.unwrap_or(base.recovery_timeout),
            test_requests: self.test_requests.unwrap_or(base.test_requests),
            half_open_failure_policy: self
                .half_open_failure_policy
                .unwrap_or(base.half_open_failure_policy),
        }
    }
}

impl From<&ServiceConfig> for CircuitOverrides {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout: config.recovery_timeout_secs.map(Duration::from_secs),
            test_requests: config.test_requests,
            half_open_failure_policy: config.half_open_failure_policy,
        }
    }
}
