//! Integration tests for waiting on remote operations.
//!
//! Covers the full "start, wait, fetch result" flow as well as failed,
//! cancelled, unknown and never-ending operations.

#![cfg(feature = "test-harness")]

use std::time::Duration;

use routeopt_await::test_harness::{ApiCall, ScriptedOperationsApi, TestEnvironment};
use routeopt_await::{
    AwaitConfig, AwaitError, ErrorDetail, Operation, OperationStatus, OperationsApi, SystemClock,
};
use serde_json::json;
use uuid::Uuid;

use super::simulated_env;

/// Tests the complete flow from a running operation to its plan.
///
/// **Flow:**
/// 1. Operation reports RUNNING three times, then COMPLETED
/// 2. The poller sleeps one poll interval between fetches
/// 3. The result is fetched exactly once after completion
#[test]
fn test_plan_after_operation() {
    let id = Uuid::new_v4();
    let plan = json!({
        "routes": [
            {"vehicleId": "Vehicle1", "stops": ["Depot", "Customer1", "Depot"]}
        ],
        "unplannedTransports": []
    });
    let api = ScriptedOperationsApi::new()
        .with_statuses(
            id,
            &[
                OperationStatus::Running,
                OperationStatus::Running,
                OperationStatus::Running,
                OperationStatus::Completed,
            ],
        )
        .with_result(id, plan.clone());
    let env = simulated_env(api);
    env.track(id);

    let result = env.result_after_operation(id).unwrap();

    assert_eq!(result, plan);
    assert_eq!(env.clock().sleeps(), vec![Duration::from_secs(5); 3]);
    assert_eq!(env.api().status_fetches(id), 4);
    assert_eq!(
        env.api()
            .calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::FetchResult(_)))
            .count(),
        1
    );
}

/// Tests that a failed operation surfaces the service's error payload.
#[test]
fn test_failed_operation_reports_error_detail() {
    let id = Uuid::new_v4();
    let detail = ErrorDetail::new("VALIDATION_ERROR", "Location 'Depot' has no coordinates.")
        .with_details(json!({"locationId": "Depot"}));
    let api = ScriptedOperationsApi::new()
        .with_operations(
            id,
            vec![Operation::running(id), Operation::failed(id, detail.clone())],
        )
        .with_result(id, json!({}));
    let env = simulated_env(api);

    let error = env.result_after_operation(id).unwrap_err();

    assert_eq!(error.operation_error(), Some(&detail));
    assert_eq!(
        error.to_string(),
        format!("Operation {id} failed: VALIDATION_ERROR: Location 'Depot' has no coordinates.")
    );
    assert!(!env.api().calls().contains(&ApiCall::FetchResult(id)));
}

/// Tests waiting on an operation that was cancelled while running.
#[test]
fn test_cancelled_operation() {
    let id = Uuid::new_v4();
    let env = simulated_env(
        ScriptedOperationsApi::new().with_statuses(id, &[OperationStatus::Running]),
    );
    env.track(id);

    env.api().cancel(id).unwrap();
    let error = env.poller().poll(id).unwrap_err();

    assert_eq!(error.operation_error().unwrap().code, "CANCELLED");
    assert_eq!(env.clock().sleep_count(), 0);
}

/// Tests that polling an id the service does not know fails at once.
#[test]
fn test_not_existing_operation() {
    let env = simulated_env(ScriptedOperationsApi::new());
    let id = Uuid::new_v4();

    let error = env.result_after_operation(id).unwrap_err();

    match &error {
        AwaitError::Transport(e) => assert!(e.to_string().contains("not found")),
        other => panic!("Expected Transport error, got {other:?}"),
    }
    assert_eq!(env.clock().sleep_count(), 0);
}

/// Tests that a completed operation whose result is missing is a transport failure.
#[test]
fn test_missing_result() {
    let id = Uuid::new_v4();
    let env = simulated_env(
        ScriptedOperationsApi::new().with_statuses(id, &[OperationStatus::Completed]),
    );

    let error = env.result_after_operation(id).unwrap_err();
    assert!(matches!(error, AwaitError::Transport(_)));
}

/// Tests that an operation that never finishes stops at the hard cap.
#[test]
fn test_hard_cap() {
    let id = Uuid::new_v4();
    let env = simulated_env(
        ScriptedOperationsApi::new().with_statuses(id, &[OperationStatus::Running]),
    );

    let error = env.poller().poll(id).unwrap_err();

    assert!(error.is_timeout());
    assert!(error
        .to_string()
        .starts_with(&format!("Timeout while awaiting operation {id}.")));
    let fetches = env.api().status_fetches(id);
    assert_eq!(fetches, 13);
    assert!(env.clock().elapsed() <= Duration::from_secs(65));
}

/// Tests several operations polled from separate threads on the wall clock.
#[test]
fn test_concurrent_polls() {
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let mut api = ScriptedOperationsApi::new();
    for (round, id) in ids.iter().enumerate() {
        let mut statuses = vec![OperationStatus::Running; round];
        statuses.push(OperationStatus::Completed);
        api = api
            .with_statuses(*id, &statuses)
            .with_result(*id, json!({"round": round}));
    }
    let config = AwaitConfig {
        operation_hard_cap_secs: 5,
        operation_poll_interval_ms: 10,
        ..Default::default()
    };
    let env = TestEnvironment::with_clock(api, config, SystemClock);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let env = &env;
                scope.spawn(move || env.result_after_operation(*id))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    for (round, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), json!({"round": round}));
        assert_eq!(env.api().status_fetches(ids[round]), round + 1);
    }
}

/// Tests a configured condition awaiting the status of an operation.
#[test]
fn test_awaiting_status_with_configured_settings() {
    let id = Uuid::new_v4();
    let config = AwaitConfig {
        condition_description: "operation status".to_string(),
        condition_timeout_secs: 20,
        condition_retry_interval_ms: 2000,
        ..Default::default()
    };
    let env = TestEnvironment::with_clock(
        ScriptedOperationsApi::new().with_statuses(
            id,
            &[
                OperationStatus::Running,
                OperationStatus::Running,
                OperationStatus::Completed,
            ],
        ),
        config,
        routeopt_await::SimulatedClock::new(),
    );

    let status = env
        .awaiter()
        .repeat_action(|| Ok(env.api().fetch_status(id)?.status))
        .while_value_equals(OperationStatus::Running)
        .await_with(env.clock())
        .unwrap();

    assert_eq!(status, OperationStatus::Completed);
    assert_eq!(env.clock().elapsed(), Duration::from_secs(4));
}
