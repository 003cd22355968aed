//! Call statistics and circuit status reports.

use serde::Serialize;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::policy::HalfOpenFailurePolicy;

/// Per-service call counters. Monotonic; never reset, not even by `register_service`.
///
/// Every reported outcome counts toward `total_calls`, so
/// `total_calls == successful_calls + failed_calls + blocked_calls`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallStatistics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub blocked_calls: u64,
}

impl CallStatistics {
    pub(crate) fn record_success(&mut self) {
        self.total_calls += 1;
        self.successful_calls += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.total_calls += 1;
        self.failed_calls += 1;
    }

    pub(crate) fn record_blocked(&mut self) {
        self.total_calls += 1;
        self.blocked_calls += 1;
    }
}

/// Snapshot of one circuit, with timestamps formatted as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitStatus {
    pub service_name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
    pub last_failure_time: Option<String>,
    pub last_error: Option<String>,
    pub test_request_count: u32,
    pub test_requests: u32,
    pub half_open_failure_policy: HalfOpenFailurePolicy,
    pub created_at: String,
    pub statistics: CallStatistics,
}

/// Process-wide aggregate across every circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStats {
    pub total_circuits: usize,
    pub closed_circuits: usize,
    pub open_circuits: usize,
    pub half_open_circuits: usize,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub blocked_calls: u64,
    /// Percentage of `total_calls` that succeeded; 0 when nothing was called.
    pub success_rate: f64,
}

impl CircuitBreakerStats {
    pub(crate) fn new() -> Self {
        Self {
            total_circuits: 0,
            closed_circuits: 0,
            open_circuits: 0,
            half_open_circuits: 0,
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            blocked_calls: 0,
            success_rate: 0.0,
        }
    }

    pub(crate) fn count_state(&mut self, state: CircuitState) {
        self.total_circuits += 1;
        match state {
            CircuitState::Closed => self.closed_circuits += 1,
            CircuitState::Open => self.open_circuits += 1,
            CircuitState::HalfOpen => self.half_open_circuits += 1,
        }
    }

    pub(crate) fn add_calls(&mut self, stats: &CallStatistics) {
        self.total_calls += stats.total_calls;
        self.successful_calls += stats.successful_calls;
        self.failed_calls += stats.failed_calls;
        self.blocked_calls += stats.blocked_calls;
    }

    pub(crate) fn finish(mut self) -> Self {
        self.success_rate = if self.total_calls > 0 {
            self.successful_calls as f64 / self.total_calls as f64 * 100.0
        } else {
            0.0
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_keep_total_consistent() {
        let mut stats = CallStatistics::default();
        stats.record_success();
        stats.record_success();
        stats.record_failure();
        stats.record_blocked();

        assert_eq!(stats.total_calls, 4);
        assert_eq!(
            stats.total_calls,
            stats.successful_calls + stats.failed_calls + stats.blocked_calls
        );
    }

    #[test]
    fn test_aggregate_success_rate() {
        let mut a = CallStatistics::default();
        a.record_success();
        a.record_failure();
        let mut b = CallStatistics::default();
        b.record_success();
        b.record_success();

        let mut agg = CircuitBreakerStats::new();
        agg.count_state(CircuitState::Closed);
        agg.count_state(CircuitState::Open);
        agg.add_calls(&a);
        agg.add_calls(&b);
        let agg = agg.finish();

        assert_eq!(agg.total_circuits, 2);
        assert_eq!(agg.open_circuits, 1);
        assert_eq!(agg.total_calls, 4);
        assert!((agg.success_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_success_rate_is_zero() {
        let agg = CircuitBreakerStats::new().finish();
        assert_eq!(agg.success_rate, 0.0);
    }
}
