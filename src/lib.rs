//! Resilience primitives for calls between internal services.
//!
//! A [`CircuitRegistry`] decides whether a service may be called and tracks
//! outcomes; a [`LoadBalancer`] picks which replica of a service to call. The
//! two are independent and composed by the caller:
//!
//! ```text
//! balancer.get_instance(service, strategy)
//!     → circuits.execute(service, || call(instance))
//!         → admitted: operation runs, outcome recorded
//!         → denied:   CircuitOpenError, operation never runs
//!     → balancer.finish_request(instance.id)
//! ```

pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use bootstrap::Resilience;
pub use config::ResilienceConfig;
pub use load_balancer::{LoadBalancer, ServiceInstance, Strategy};
pub use resilience::{CircuitOpenError, CircuitRegistry, CircuitState};
