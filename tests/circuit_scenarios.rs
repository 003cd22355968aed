//! Circuit breaker behavior through the public registry API.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use service_resilience::resilience::{CircuitOverrides, HalfOpenFailurePolicy};
use service_resilience::{CircuitRegistry, CircuitState};

mod common;
use common::RpcError;

#[test]
fn test_threshold_failures_open_the_circuit() {
    let registry = CircuitRegistry::default();
    registry.register_service("auth", CircuitOverrides::default().failure_threshold(3));

    registry.record_failure("auth", Some("connection refused"));
    registry.record_failure("auth", None);
    assert_eq!(registry.state("auth"), Some(CircuitState::Closed));

    registry.record_failure("auth", None);
    let status = registry.get_circuit_status("auth").unwrap();
    assert_eq!(status.state, CircuitState::Open);
    assert_eq!(serde_json::to_value(&status).unwrap()["state"], "open");
}

#[test]
fn test_open_blocks_until_recovery_timeout() {
    let registry = CircuitRegistry::default();
    registry.register_service(
        "auth",
        CircuitOverrides::default()
            .failure_threshold(1)
            .recovery_timeout(Duration::from_millis(100)),
    );
    registry.record_failure("auth", None);

    for _ in 0..5 {
        assert!(!registry.can_execute("auth"));
    }
    assert_eq!(registry.state("auth"), Some(CircuitState::Open));

    std::thread::sleep(Duration::from_millis(120));

    assert!(registry.can_execute("auth"));
    let status = registry.get_circuit_status("auth").unwrap();
    assert_eq!(status.state, CircuitState::HalfOpen);
    assert_eq!(status.test_request_count, 0);
}

#[test]
fn test_half_open_probes_close_the_circuit() {
    let registry = CircuitRegistry::default();
    registry.register_service(
        "auth",
        CircuitOverrides::default()
            .failure_threshold(1)
            .recovery_timeout(Duration::ZERO)
            .test_requests(2),
    );
    registry.record_failure("auth", None);
    assert!(registry.can_execute("auth"));
    assert_eq!(registry.state("auth"), Some(CircuitState::HalfOpen));

    registry.record_success("auth");
    assert_eq!(registry.state("auth"), Some(CircuitState::HalfOpen));
    registry.record_success("auth");

    let status = registry.get_circuit_status("auth").unwrap();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);
}

#[test]
fn test_half_open_admits_only_while_quota_remains() {
    let registry = CircuitRegistry::default();
    registry.register_service(
        "auth",
        CircuitOverrides::default()
            .failure_threshold(1)
            .recovery_timeout(Duration::ZERO)
            .test_requests(3),
    );
    registry.record_failure("auth", None);
    assert!(registry.can_execute("auth"));

    // Admission alone does not consume the quota; successes do.
    assert!(registry.can_execute("auth"));
    registry.record_success("auth");
    registry.record_success("auth");
    assert!(registry.can_execute("auth"));
    assert_eq!(registry.state("auth"), Some(CircuitState::HalfOpen));
}

#[test]
fn test_half_open_failure_policies_differ_only_below_threshold() {
    let registry = CircuitRegistry::default();
    for (name, policy) in [
        ("cumulative", HalfOpenFailurePolicy::Cumulative),
        ("immediate", HalfOpenFailurePolicy::ReopenImmediately),
    ] {
        registry.register_service(
            name,
            CircuitOverrides::default()
                .failure_threshold(3)
                .recovery_timeout(Duration::ZERO)
                .half_open_failure_policy(policy),
        );
        registry.force_open(name);
        assert!(registry.can_execute(name));
        registry.record_failure(name, Some("probe failed"));
    }

    assert_eq!(registry.state("cumulative"), Some(CircuitState::HalfOpen));
    assert_eq!(registry.state("immediate"), Some(CircuitState::Open));

    // A circuit that tripped on failures carries its count into half-open,
    // so the cumulative policy reopens on the first failed probe as well.
    registry.register_service(
        "tripped",
        CircuitOverrides::default()
            .failure_threshold(2)
            .recovery_timeout(Duration::ZERO),
    );
    registry.record_failure("tripped", None);
    registry.record_failure("tripped", None);
    assert!(registry.can_execute("tripped"));
    registry.record_failure("tripped", None);
    assert_eq!(registry.state("tripped"), Some(CircuitState::Open));
}

#[tokio::test]
async fn test_execute_never_invokes_operation_when_open() {
    let registry = CircuitRegistry::default();
    registry.force_open("billing");

    let invoked = AtomicU32::new(0);
    let calls = &invoked;
    let result: Result<(), RpcError> = registry
        .execute("billing", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert_eq!(result, Err(RpcError::CircuitOpen("billing".into())));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    let stats = registry.statistics("billing").unwrap();
    assert_eq!(stats.blocked_calls, 1);
    assert_eq!(stats.total_calls, 1);
}

#[tokio::test]
async fn test_execute_trips_and_returns_operation_errors_unchanged() {
    let registry = CircuitRegistry::default();
    registry.register_service("billing", CircuitOverrides::default().failure_threshold(2));

    for _ in 0..2 {
        let result: Result<u32, RpcError> = registry
            .execute("billing", || async { Err(RpcError::Unavailable(503)) })
            .await;
        assert_eq!(result, Err(RpcError::Unavailable(503)));
    }

    assert_eq!(registry.state("billing"), Some(CircuitState::Open));
    let status = registry.get_circuit_status("billing").unwrap();
    assert_eq!(status.last_error.as_deref(), Some("upstream returned 503"));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_circuit() {
    let registry = Arc::new(CircuitRegistry::default());
    registry.register_service("search", CircuitOverrides::default().failure_threshold(1_000));

    let mut handles = Vec::new();
    for task in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            for n in 0..50 {
                let _: Result<(), RpcError> = registry
                    .execute("search", || async move {
                        if (task + n) % 5 == 0 {
                            Err(RpcError::Unavailable(500))
                        } else {
                            Ok(())
                        }
                    })
                    .await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = registry.statistics("search").unwrap();
    assert_eq!(stats.total_calls, 400);
    assert_eq!(stats.successful_calls + stats.failed_calls, 400);
    assert_eq!(stats.failed_calls, 80);
}

#[test]
fn test_aggregate_matches_per_service_sums() {
    let registry = CircuitRegistry::default();
    registry.register_service("a", CircuitOverrides::default().failure_threshold(2));
    registry.record_success("a");
    registry.record_failure("a", None);
    registry.record_failure("a", None);
    registry.record_success("b");
    registry.record_failure("c", None);

    let all = registry.get_all_circuit_status();
    let stats = registry.get_circuit_breaker_stats();

    let sum_total: u64 = all.values().map(|s| s.statistics.total_calls).sum();
    let sum_failed: u64 = all.values().map(|s| s.statistics.failed_calls).sum();
    assert_eq!(stats.total_calls, sum_total);
    assert_eq!(stats.failed_calls, sum_failed);
    assert_eq!(stats.total_circuits, all.len());
    assert_eq!(stats.open_circuits, 1);
    assert!((stats.success_rate - 40.0).abs() < 1e-9);
}
