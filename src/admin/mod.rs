//! Admin API over the circuit registry and load balancer.
//!
//! Read-only reports plus the administrative operations (force open/close,
//! health flags). Every route requires the configured bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::bootstrap::Resilience;

#[derive(Clone)]
pub struct AdminState {
    pub resilience: Resilience,
    pub api_key: Arc<String>,
}

impl AdminState {
    pub fn new(resilience: Resilience, api_key: impl Into<String>) -> Self {
        Self {
            resilience,
            api_key: Arc::new(api_key.into()),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/circuits", get(list_circuits))
        .route("/admin/circuits/stats", get(circuit_stats))
        .route("/admin/circuits/{name}", get(get_circuit))
        .route("/admin/circuits/{name}/open", post(open_circuit))
        .route("/admin/circuits/{name}/close", post(close_circuit))
        .route("/admin/services", get(list_services))
        .route("/admin/services/{name}", get(get_service))
        .route(
            "/admin/services/{name}/instances/{id}/health",
            post(set_instance_health),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
