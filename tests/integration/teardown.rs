//! Integration tests for cleanup of operations started during a test.

#![cfg(feature = "test-harness")]

use std::sync::Arc;

use anyhow::Result;
use routeopt_await::test_harness::{ApiCall, ScriptedOperationsApi, TestEnvironment};
use routeopt_await::{
    AwaitConfig, CreatedOperations, Operation, OperationStatus, OperationsApi, SimulatedClock,
    TeardownReport,
};
use serde_json::Value;
use uuid::Uuid;

use super::simulated_env;

/// Shares one scripted service between an environment and the test body.
struct SharedApi(Arc<ScriptedOperationsApi>);

impl OperationsApi for SharedApi {
    type Output = Value;

    fn fetch_status(&self, id: Uuid) -> Result<Operation> {
        self.0.fetch_status(id)
    }

    fn fetch_result(&self, id: Uuid) -> Result<Value> {
        self.0.fetch_result(id)
    }

    fn cancel(&self, id: Uuid) -> Result<()> {
        self.0.cancel(id)
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        self.0.delete(id)
    }
}

/// Tests that explicit teardown cancels and deletes everything tracked.
#[test]
fn test_teardown_after_test_body() {
    let running = Uuid::new_v4();
    let finished = Uuid::new_v4();
    let env = simulated_env(
        ScriptedOperationsApi::new()
            .with_statuses(running, &[OperationStatus::Running])
            .with_statuses(finished, &[OperationStatus::Completed]),
    );
    env.track(running);
    env.track(finished);
    assert_eq!(env.tracked(), vec![running, finished]);

    let report = env.teardown();

    assert_eq!(
        report,
        TeardownReport {
            cancelled: 2,
            deleted: 2,
            ignored_failures: 0
        }
    );
    assert!(env.tracked().is_empty());
    assert!(env.api().fetch_status(running).is_err());
}

/// Tests that a failing service never makes teardown fail.
#[test]
fn test_teardown_ignores_service_failures() {
    let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let mut api = ScriptedOperationsApi::new().failing_cleanup();
    for id in &ids {
        api = api.with_statuses(*id, &[OperationStatus::Running]);
    }
    let env = simulated_env(api);
    for id in &ids {
        env.track(*id);
    }

    let report = env.teardown();

    assert_eq!(report.cancelled, 0);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.ignored_failures, 6);
    // Every id still got both calls
    let expected: Vec<ApiCall> = ids
        .iter()
        .flat_map(|id| [ApiCall::Cancel(*id), ApiCall::Delete(*id)])
        .collect();
    assert_eq!(env.api().calls(), expected);
}

/// Tests that dropping the environment cleans up after a failed test body.
#[test]
fn test_teardown_on_drop_after_timeout() {
    let id = Uuid::new_v4();
    let api =
        Arc::new(ScriptedOperationsApi::new().with_statuses(id, &[OperationStatus::Running]));

    {
        let config = AwaitConfig {
            operation_hard_cap_secs: 10,
            operation_poll_interval_ms: 1000,
            ..Default::default()
        };
        let env =
            TestEnvironment::with_clock(SharedApi(api.clone()), config, SimulatedClock::new());
        env.track(id);

        let error = env.poller().poll(id).unwrap_err();
        assert!(error.is_timeout());
    }

    assert_eq!(api.cancelled(), vec![id]);
    assert_eq!(api.deleted(), vec![id]);
}

/// Tests operations registered on a shared service while the test runs.
#[test]
fn test_operations_started_during_test() {
    let api = Arc::new(ScriptedOperationsApi::new());
    let created = CreatedOperations::new();

    for _ in 0..3 {
        let id = Uuid::new_v4();
        api.insert_operations(id, vec![Operation::running(id)]);
        created.track(id);
    }
    assert_eq!(created.len(), 3);

    let report = created.teardown(api.as_ref());

    assert_eq!(report.cancelled, 3);
    assert_eq!(report.deleted, 3);
    assert!(created.is_empty());
    assert_eq!(api.deleted().len(), 3);
}
