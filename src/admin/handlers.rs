use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::load_balancer::{LoadBalancerStats, ServiceStats};
use crate::resilience::{CircuitBreakerStats, CircuitStatus};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub circuits: usize,
    pub services: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthUpdate {
    pub healthy: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        circuits: state.resilience.circuits.service_names().len(),
        services: state.resilience.balancer.service_names().len(),
    })
}

pub async fn list_circuits(
    State(state): State<AdminState>,
) -> Json<BTreeMap<String, CircuitStatus>> {
    Json(state.resilience.circuits.get_all_circuit_status())
}

pub async fn circuit_stats(State(state): State<AdminState>) -> Json<CircuitBreakerStats> {
    Json(state.resilience.circuits.get_circuit_breaker_stats())
}

pub async fn get_circuit(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitStatus>, StatusCode> {
    state
        .resilience
        .circuits
        .get_circuit_status(&name)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn open_circuit(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitStatus>, StatusCode> {
    state.resilience.circuits.force_open(&name);
    get_circuit(State(state), Path(name)).await
}

pub async fn close_circuit(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitStatus>, StatusCode> {
    state.resilience.circuits.force_close(&name);
    get_circuit(State(state), Path(name)).await
}

pub async fn list_services(State(state): State<AdminState>) -> Json<LoadBalancerStats> {
    Json(state.resilience.balancer.get_load_balancer_stats())
}

pub async fn get_service(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<ServiceStats>, StatusCode> {
    state
        .resilience
        .balancer
        .get_service_stats(&name)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn set_instance_health(
    State(state): State<AdminState>,
    Path((service, id)): Path<(String, String)>,
    Json(update): Json<HealthUpdate>,
) -> StatusCode {
    if state
        .resilience
        .balancer
        .update_instance_health(&service, &id, update.healthy)
    {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
