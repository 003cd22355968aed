//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_circuit_transitions_total` (counter): state changes by service, from, to
//! - `resilience_circuit_calls_total` (counter): outcomes by service (success, failure, blocked)
//! - `resilience_circuit_state` (gauge): 0=closed, 1=open, 2=half_open
//! - `resilience_instance_selections_total` (counter): selections by service, strategy
//! - `resilience_instance_selection_misses_total` (counter): no instance available
//! - `resilience_active_connections` (gauge): tracked in-flight requests per instance
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::load_balancer::Strategy;
use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(
        "resilience_circuit_transitions_total",
        "Circuit breaker state transitions"
    );
    describe_counter!(
        "resilience_circuit_calls_total",
        "Calls reported to circuit breakers, by outcome"
    );
    describe_gauge!(
        "resilience_circuit_state",
        "Current circuit state (0=closed, 1=open, 2=half_open)"
    );
    describe_counter!(
        "resilience_instance_selections_total",
        "Instances handed out by the load balancer"
    );
    describe_counter!(
        "resilience_instance_selection_misses_total",
        "Selections that found no instance"
    );
    describe_gauge!(
        "resilience_active_connections",
        "Tracked in-flight requests per instance"
    );

    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    }
}

pub fn record_circuit_transition(service: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "resilience_circuit_transitions_total",
        "service" => service.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("resilience_circuit_state", "service" => service.to_string()).set(state_value(to));
}

/// `outcome` is one of "success", "failure", "blocked".
pub fn record_circuit_call(service: &str, outcome: &'static str) {
    counter!(
        "resilience_circuit_calls_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_instance_selected(service: &str, strategy: Strategy) {
    counter!(
        "resilience_instance_selections_total",
        "service" => service.to_string(),
        "strategy" => strategy.as_str()
    )
    .increment(1);
}

pub fn record_selection_miss(service: &str) {
    counter!(
        "resilience_instance_selection_misses_total",
        "service" => service.to_string()
    )
    .increment(1);
}

pub fn record_active_connections(instance: &str, count: usize) {
    gauge!("resilience_active_connections", "instance" => instance.to_string()).set(count as f64);
}
