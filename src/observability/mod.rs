//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! circuit_breaker / load_balancer
//!     → logging.rs (structured log events: transitions, denials, reloads)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
