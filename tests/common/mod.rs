//! Shared utilities for integration tests.

use std::fmt;
use std::net::SocketAddr;

use service_resilience::admin::{setup_admin_router, AdminState};
use service_resilience::{CircuitOpenError, LoadBalancer, Resilience, ServiceInstance};
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-admin-key";

/// Error type a caller of `CircuitRegistry::execute` would define.
#[derive(Debug, PartialEq)]
#[allow(dead_code)]
pub enum RpcError {
    CircuitOpen(String),
    Unavailable(u16),
}

impl From<CircuitOpenError> for RpcError {
    fn from(err: CircuitOpenError) -> Self {
        RpcError::CircuitOpen(err.service)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::CircuitOpen(service) => write!(f, "circuit open for {}", service),
            RpcError::Unavailable(status) => write!(f, "upstream returned {}", status),
        }
    }
}

/// Register instances named `ids` (as explicit ids) under `service`.
#[allow(dead_code)]
pub fn pool_of(balancer: &LoadBalancer, service: &str, ids: &[&str]) {
    for (n, id) in ids.iter().enumerate() {
        let instance = ServiceInstance::new("10.0.0.1", 7000 + n as u16).with_id(*id);
        assert!(balancer.register_instance(service, instance));
    }
}

/// Serve the admin API on an ephemeral port.
#[allow(dead_code)]
pub async fn start_admin(resilience: Resilience) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = setup_admin_router(AdminState::new(resilience, API_KEY));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
