//! Fast-fail error returned when a circuit denies admission.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::circuit_breaker::CircuitState;

/// Admission was denied; the operation was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker for service '{service}' is {state}")]
pub struct CircuitOpenError {
    pub service: String,
    pub state: CircuitState,
    /// Time until the next probe can be admitted. `None` when the circuit is
    /// half-open and its probe quota is used up.
    pub retry_after: Option<Duration>,
}
