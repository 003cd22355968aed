//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to another service:
//!     → circuit_breaker.rs (admit or fail fast with CircuitOpenError)
//!     → operation runs against the instance chosen by the load balancer
//!     → outcome reported back (success / failure) and counted in stats.rs
//! ```
//!
//! # Design Decisions
//! - No retries here; retry policy is composed on top of `CircuitRegistry::execute`
//! - The operation's own error is returned untouched
//! - Half-open failure handling is a named policy (policy.rs)

pub mod circuit_breaker;
pub mod error;
pub mod policy;
pub mod stats;

pub use circuit_breaker::{CircuitRegistry, CircuitState, ServiceCircuit};
pub use error::CircuitOpenError;
pub use policy::{CircuitOverrides, CircuitSettings, HalfOpenFailurePolicy};
pub use stats::{CallStatistics, CircuitBreakerStats, CircuitStatus};
