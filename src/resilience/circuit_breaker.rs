//! Circuit breaker for calls to other services.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: a limited number of probe calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open:      failure_count >= failure_threshold
//! Open → Half-Open:   first admission check after recovery_timeout since the last failure
//! Half-Open → Closed: test_requests successful probes
//! Half-Open → Open:   decided by HalfOpenFailurePolicy
//! ```
//!
//! # Design Decisions
//! - One circuit per service name, created lazily with the registry defaults
//! - A success while closed resets the failure count (no sliding window)
//! - `failure_count` survives the trip to half-open; only closing resets it
//! - Each circuit is mutated under its own map entry lock, never across an await

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;
use crate::resilience::error::CircuitOpenError;
use crate::resilience::policy::{CircuitOverrides, CircuitSettings};
use crate::resilience::stats::{CallStatistics, CircuitBreakerStats, CircuitStatus};

/// State of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime state and configuration of one service's circuit.
#[derive(Debug, Clone)]
pub struct ServiceCircuit {
    pub service_name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub test_request_count: u32,
    pub settings: CircuitSettings,
    /// Monotonic time of the last failure; drives the recovery timeout.
    pub last_failure: Option<Instant>,
    /// Wall-clock time of the last failure, for reporting only.
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceCircuit {
    /// `test_requests` is raised to at least 1 so a half-open circuit can close.
    pub fn new(service_name: impl Into<String>, settings: CircuitSettings) -> Self {
        Self {
            service_name: service_name.into(),
            state: CircuitState::Closed,
            failure_count: 0,
            test_request_count: 0,
            settings: CircuitSettings {
                test_requests: settings.test_requests.max(1),
                ..settings
            },
            last_failure: None,
            last_failure_time: None,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    fn enter(&mut self, state: CircuitState) {
        match state {
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::HalfOpen => self.test_request_count = 0,
            CircuitState::Open => {}
        }
        self.state = state;
    }

    /// Time left before an open circuit admits its first probe.
    pub fn remaining_open(&self, now: Instant) -> Duration {
        match self.last_failure {
            Some(at) => self
                .settings
                .recovery_timeout
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }

    /// Admission decision. May move an open circuit to half-open.
    pub fn try_admit(&mut self, now: Instant) -> Result<(), CircuitOpenError> {
        match self.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let remaining = self.remaining_open(now);
                if remaining.is_zero() {
                    self.enter(CircuitState::HalfOpen);
                    Ok(())
                } else {
                    Err(self.denied(Some(remaining)))
                }
            }
            CircuitState::HalfOpen => {
                if self.test_request_count < self.settings.test_requests {
                    Ok(())
                } else {
                    Err(self.denied(None))
                }
            }
        }
    }

    fn denied(&self, retry_after: Option<Duration>) -> CircuitOpenError {
        CircuitOpenError {
            service: self.service_name.clone(),
            state: self.state,
            retry_after,
        }
    }

    pub fn on_success(&mut self) {
        match self.state {
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::HalfOpen => {
                self.test_request_count += 1;
                if self.test_request_count >= self.settings.test_requests {
                    self.enter(CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn on_failure(&mut self, now: Instant, error: Option<&str>) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(now);
        self.last_failure_time = Some(Utc::now());
        if let Some(error) = error {
            self.last_error = Some(error.to_string());
        }

        let reopen = match self.state {
            CircuitState::Closed => self.failure_count >= self.settings.failure_threshold,
            CircuitState::HalfOpen => self
                .settings
                .half_open_failure_policy
                .should_reopen(self.failure_count, self.settings.failure_threshold),
            CircuitState::Open => false,
        };
        if reopen {
            self.enter(CircuitState::Open);
        }
    }

    /// Open regardless of failures; the recovery timeout starts now.
    pub fn force_open(&mut self, now: Instant) {
        self.last_failure = Some(now);
        self.last_failure_time = Some(Utc::now());
        self.enter(CircuitState::Open);
    }

    pub fn force_close(&mut self) {
        self.enter(CircuitState::Closed);
    }

    pub fn status(&self, statistics: CallStatistics) -> CircuitStatus {
        CircuitStatus {
            service_name: self.service_name.clone(),
            state: self.state,
            failure_count: self.failure_count,
            failure_threshold: self.settings.failure_threshold,
            recovery_timeout_secs: self.settings.recovery_timeout.as_secs_f64(),
            last_failure_time: self
                .last_failure_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            last_error: self.last_error.clone(),
            test_request_count: self.test_request_count,
            test_requests: self.settings.test_requests,
            half_open_failure_policy: self.settings.half_open_failure_policy,
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            statistics,
        }
    }
}

/// Owns one circuit and one set of call statistics per service name.
#[derive(Debug)]
pub struct CircuitRegistry {
    circuits: DashMap<String, ServiceCircuit>,
    statistics: DashMap<String, CallStatistics>,
    defaults: ArcSwap<CircuitSettings>,
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new(CircuitSettings::default())
    }
}

impl CircuitRegistry {
    /// Create a registry whose auto-registered circuits use `defaults`.
    pub fn new(defaults: CircuitSettings) -> Self {
        Self {
            circuits: DashMap::new(),
            statistics: DashMap::new(),
            defaults: ArcSwap::from_pointee(defaults),
        }
    }

    pub fn defaults(&self) -> CircuitSettings {
        **self.defaults.load()
    }

    /// Replace the defaults for circuits registered from now on.
    pub fn set_defaults(&self, defaults: CircuitSettings) {
        self.defaults.store(Arc::new(defaults));
    }

    /// Create or overwrite a circuit. Runtime state resets to closed;
    /// statistics are kept.
    pub fn register_service(&self, name: &str, overrides: CircuitOverrides) {
        let circuit = ServiceCircuit::new(name, overrides.apply(&self.defaults()));
        let settings = circuit.settings;
        let replaced = self.circuits.insert(name.to_string(), circuit);
        self.statistics.entry(name.to_string()).or_default();

        if let Some(previous) = replaced {
            if previous.state != CircuitState::Closed {
                log_transition(name, previous.state, CircuitState::Closed);
            }
        }

        tracing::info!(
            service = %name,
            failure_threshold = settings.failure_threshold,
            recovery_timeout = ?settings.recovery_timeout,
            test_requests = settings.test_requests,
            policy = ?settings.half_open_failure_policy,
            "Circuit registered"
        );
    }

    fn circuit(&self, name: &str) -> RefMut<'_, String, ServiceCircuit> {
        if let Some(circuit) = self.circuits.get_mut(name) {
            return circuit;
        }
        self.circuits.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(service = %name, "Auto-registering circuit with defaults");
            ServiceCircuit::new(name, self.defaults())
        })
    }

    fn with_circuit<R>(&self, name: &str, f: impl FnOnce(&mut ServiceCircuit) -> R) -> R {
        let (result, from, to) = {
            let mut circuit = self.circuit(name);
            let from = circuit.state;
            let result = f(circuit.value_mut());
            (result, from, circuit.state)
        };
        if from != to {
            log_transition(name, from, to);
        }
        result
    }

    fn with_statistics(&self, name: &str, f: impl FnOnce(&mut CallStatistics)) {
        f(self.statistics.entry(name.to_string()).or_default().value_mut());
    }

    /// Admission decision with the reason for a denial.
    pub fn check(&self, name: &str) -> Result<(), CircuitOpenError> {
        let now = Instant::now();
        let result = self.with_circuit(name, |circuit| circuit.try_admit(now));
        if let Err(denied) = &result {
            tracing::debug!(
                service = %name,
                state = %denied.state,
                retry_after = ?denied.retry_after,
                "Call denied by circuit breaker"
            );
        }
        result
    }

    /// Whether a call to `name` may proceed right now.
    pub fn can_execute(&self, name: &str) -> bool {
        self.check(name).is_ok()
    }

    pub fn record_success(&self, name: &str) {
        self.with_circuit(name, |circuit| circuit.on_success());
        self.with_statistics(name, CallStatistics::record_success);
        metrics::record_circuit_call(name, "success");
    }

    pub fn record_failure(&self, name: &str, error: Option<&str>) {
        let now = Instant::now();
        let failure_count = self.with_circuit(name, |circuit| {
            circuit.on_failure(now, error);
            circuit.failure_count
        });
        self.with_statistics(name, CallStatistics::record_failure);
        metrics::record_circuit_call(name, "failure");

        tracing::debug!(
            service = %name,
            failure_count,
            error = error.unwrap_or("unspecified"),
            "Failure recorded"
        );
    }

    fn record_blocked(&self, name: &str) {
        self.with_statistics(name, CallStatistics::record_blocked);
        metrics::record_circuit_call(name, "blocked");
    }

    /// Run `operation` under the circuit for `name`.
    ///
    /// When admission is denied the operation is not invoked and the call is
    /// counted as blocked. Otherwise the outcome is recorded and the
    /// operation's own result is returned as is.
    pub async fn execute<F, Fut, T, E>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError> + fmt::Display,
    {
        if let Err(denied) = self.check(name) {
            self.record_blocked(name);
            return Err(E::from(denied));
        }

        match operation().await {
            Ok(value) => {
                self.record_success(name);
                Ok(value)
            }
            Err(e) => {
                self.record_failure(name, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    pub fn force_open(&self, name: &str) {
        let now = Instant::now();
        self.with_circuit(name, |circuit| circuit.force_open(now));
        tracing::warn!(service = %name, "Circuit forced open");
    }

    pub fn force_close(&self, name: &str) {
        self.with_circuit(name, ServiceCircuit::force_close);
        tracing::info!(service = %name, "Circuit forced closed");
    }

    /// Current state without side effects. `None` for unknown services.
    pub fn state(&self, name: &str) -> Option<CircuitState> {
        self.circuits.get(name).map(|c| c.state)
    }

    pub fn statistics(&self, name: &str) -> Option<CallStatistics> {
        self.statistics.get(name).map(|s| *s)
    }

    pub fn get_circuit_status(&self, name: &str) -> Option<CircuitStatus> {
        let circuit = self.circuits.get(name)?.value().clone();
        let statistics = self.statistics(name).unwrap_or_default();
        Some(circuit.status(statistics))
    }

    pub fn get_all_circuit_status(&self) -> BTreeMap<String, CircuitStatus> {
        let circuits: Vec<ServiceCircuit> =
            self.circuits.iter().map(|entry| entry.value().clone()).collect();

        circuits
            .into_iter()
            .map(|circuit| {
                let statistics = self.statistics(&circuit.service_name).unwrap_or_default();
                (circuit.service_name.clone(), circuit.status(statistics))
            })
            .collect()
    }

    pub fn get_circuit_breaker_stats(&self) -> CircuitBreakerStats {
        let mut stats = CircuitBreakerStats::new();
        for circuit in self.circuits.iter() {
            stats.count_state(circuit.state);
        }
        for entry in self.statistics.iter() {
            stats.add_calls(entry.value());
        }
        stats.finish()
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.circuits.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

fn log_transition(service: &str, from: CircuitState, to: CircuitState) {
    match to {
        CircuitState::Open => {
            tracing::warn!(service = %service, from = %from, "Circuit breaker opened");
        }
        CircuitState::HalfOpen => {
            tracing::info!(service = %service, from = %from, "Circuit breaker half-open, probing recovery");
        }
        CircuitState::Closed => {
            tracing::info!(service = %service, from = %from, "Circuit breaker closed");
        }
    }
    metrics::record_circuit_transition(service, from, to);
}
