//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Caller needs to reach a service
//!     → pool.rs (look up the service's instances)
//!     → Apply selection strategy:
//!         - round_robin.rs (rotate through instances)
//!         - random.rs (uniform choice)
//!         - least_conn.rs (pick instance with fewest tracked requests)
//!         - weighted.rs (probability proportional to weight)
//!     → connections.rs (track / finish in-flight requests)
//!     → Return instance, or None when nothing is available
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless except round robin, whose cursor lives in the pool
//! - Strategy chosen per call, with a per-service default
//! - Health flag is recorded but only filters selection when `skip_unhealthy` is set
//! - Unknown service or empty pool yields `None`, never an error

pub mod connections;
pub mod instance;
pub mod least_conn;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod stats;
pub mod weighted;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use connections::ConnectionCounts;
pub use instance::ServiceInstance;
pub use pool::{ConnectionGuard, InstancePool, LoadBalancer, LoadBalancerSettings};
pub use stats::{InstanceStats, LoadBalancerStats, ServiceStats};

/// Selection algorithm over a non-filtered or health-filtered candidate list.
pub trait Selector: Send + Sync + fmt::Debug {
    /// Pick one of `instances`, or `None` if the slice is empty.
    fn next_instance<'a>(
        &self,
        instances: &[&'a ServiceInstance],
        connections: &ConnectionCounts,
    ) -> Option<&'a ServiceInstance>;
}

/// Named selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
    LeastConnections,
    Weighted,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round_robin",
            Strategy::Random => "random",
            Strategy::LeastConnections => "least_connections",
            Strategy::Weighted => "weighted",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown load balancing strategy '{0}'")]
pub struct StrategyParseError(pub String);

impl FromStr for Strategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Strategy::RoundRobin),
            "random" => Ok(Strategy::Random),
            "least_connections" => Ok(Strategy::LeastConnections),
            "weighted" => Ok(Strategy::Weighted),
            other => Err(StrategyParseError(other.to_string())),
        }
    }
}
