use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::awaiter::{PollConfiguration, PollConfigurationBuilder};
use crate::clock::{Clock, SystemClock};
use crate::config::{load_config, AwaitConfig};
use crate::error::AwaitError;
use crate::operations::{
    CreatedOperations, ErrorDetail, Operation, OperationPoller, OperationStatus, OperationsApi,
    TeardownReport,
};

/// A call received by [`ScriptedOperationsApi`], in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    FetchStatus(Uuid),
    FetchResult(Uuid),
    Cancel(Uuid),
    Delete(Uuid),
}

#[derive(Debug, Default)]
struct ScriptState {
    scripts: HashMap<Uuid, Vec<Operation>>,
    results: HashMap<Uuid, Value>,
    fetches: HashMap<Uuid, usize>,
    calls: Vec<ApiCall>,
    successful: Vec<ApiCall>,
}

/// In-memory operations service replaying scripted status sequences.
///
/// Each status fetch serves the next scripted snapshot; the last one repeats
/// forever. Ids without a script behave like a service answering "not found".
#[derive(Debug, Default)]
pub struct ScriptedOperationsApi {
    state: Mutex<ScriptState>,
    fail_cancel: bool,
    fail_delete: bool,
}

impl ScriptedOperationsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(self, id: Uuid, statuses: &[OperationStatus]) -> Self {
        let operations = statuses
            .iter()
            .map(|status| match status {
                OperationStatus::Running => Operation::running(id),
                OperationStatus::Completed => Operation::completed(id),
                OperationStatus::Failed => Operation::failed(
                    id,
                    ErrorDetail::new("SOLVER_ERROR", "scripted failure"),
                ),
            })
            .collect();
        self.with_operations(id, operations)
    }

    pub fn with_operations(self, id: Uuid, operations: Vec<Operation>) -> Self {
        self.insert_operations(id, operations);
        self
    }

    pub fn with_result(self, id: Uuid, result: Value) -> Self {
        self.state().results.insert(id, result);
        self
    }

    /// Make every cancel call fail.
    pub fn failing_cancellation(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    /// Make every cancel and delete call fail.
    pub fn failing_cleanup(mut self) -> Self {
        self.fail_cancel = true;
        self.fail_delete = true;
        self
    }

    /// Register an operation on a shared instance, as if it had just been started.
    pub fn insert_operations(&self, id: Uuid, operations: Vec<Operation>) {
        self.state().scripts.insert(id, operations);
    }

    pub fn status_fetches(&self, id: Uuid) -> usize {
        self.state().fetches.get(&id).copied().unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Ids of successful cancel calls.
    pub fn cancelled(&self) -> Vec<Uuid> {
        self.calls_matching(|call| match call {
            ApiCall::Cancel(id) => Some(*id),
            _ => None,
        })
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        self.calls_matching(|call| match call {
            ApiCall::Delete(id) => Some(*id),
            _ => None,
        })
    }

    fn calls_matching<F>(&self, select: F) -> Vec<Uuid>
    where
        F: Fn(&ApiCall) -> Option<Uuid>,
    {
        self.state().successful.iter().filter_map(select).collect()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OperationsApi for ScriptedOperationsApi {
    type Output = Value;

    fn fetch_status(&self, id: Uuid) -> Result<Operation> {
        let mut state = self.state();
        state.calls.push(ApiCall::FetchStatus(id));

        let served = state.fetches.get(&id).copied().unwrap_or(0);
        let operation = {
            let script = state
                .scripts
                .get(&id)
                .ok_or_else(|| anyhow!("operation {id} not found"))?;
            script
                .get(served)
                .or_else(|| script.last())
                .cloned()
                .ok_or_else(|| anyhow!("no status scripted for operation {id}"))?
        };
        state.fetches.insert(id, served + 1);
        Ok(operation)
    }

    fn fetch_result(&self, id: Uuid) -> Result<Value> {
        let mut state = self.state();
        state.calls.push(ApiCall::FetchResult(id));
        state
            .results
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("result of operation {id} not found"))
    }

    fn cancel(&self, id: Uuid) -> Result<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::Cancel(id));
        if self.fail_cancel {
            return Err(anyhow!("cancel of operation {id} rejected"));
        }

        let script = state
            .scripts
            .get_mut(&id)
            .ok_or_else(|| anyhow!("operation {id} not found"))?;
        if script.last().is_some_and(Operation::is_running) {
            *script = vec![Operation::failed(
                id,
                ErrorDetail::new("CANCELLED", "operation was cancelled"),
            )];
        }
        state.successful.push(ApiCall::Cancel(id));
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state();
        state.calls.push(ApiCall::Delete(id));
        if self.fail_delete {
            return Err(anyhow!("delete of {id} rejected"));
        }

        state
            .scripts
            .remove(&id)
            .ok_or_else(|| anyhow!("operation {id} not found"))?;
        state.results.remove(&id);
        state.successful.push(ApiCall::Delete(id));
        Ok(())
    }
}

/// Api, clock and configuration for one test, with cleanup of started operations.
///
/// Every tracked operation is cancelled and deleted on [`teardown`](Self::teardown)
/// or, failing that, when the environment is dropped.
pub struct TestEnvironment<A: OperationsApi, C: Clock = SystemClock> {
    api: A,
    clock: C,
    config: AwaitConfig,
    created: CreatedOperations,
}

impl<A: OperationsApi> TestEnvironment<A> {
    /// Creates an environment on the wall clock, configured from `ROUTEOPT_*` env vars.
    pub fn new(api: A) -> Result<Self> {
        let config = load_config(None)?;
        Ok(Self::with_clock(api, config, SystemClock))
    }
}

impl<A: OperationsApi, C: Clock> TestEnvironment<A, C> {
    pub fn with_clock(api: A, config: AwaitConfig, clock: C) -> Self {
        config.init_logging();
        log::debug!("Test environment initialized with {config:?}");
        Self {
            api,
            clock,
            config,
            created: CreatedOperations::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &AwaitConfig {
        &self.config
    }

    /// Register an operation for cleanup.
    pub fn track(&self, id: Uuid) -> Uuid {
        self.created.track(id);
        id
    }

    pub fn tracked(&self) -> Vec<Uuid> {
        self.created.ids().clone()
    }

    pub fn poller(&self) -> OperationPoller<'_, A> {
        OperationPoller::from_config(&self.api, &self.clock, &self.config)
    }

    pub fn result_after_operation(&self, id: Uuid) -> Result<A::Output, AwaitError<Operation>> {
        self.poller().result_after_operation(id)
    }

    /// Condition builder preloaded with the configured description and timing.
    pub fn awaiter<'a, T>(&self) -> PollConfigurationBuilder<'a, T> {
        PollConfiguration::builder().with_settings(self.config.poll_settings())
    }

    pub fn teardown(&self) -> TeardownReport {
        log::info!("Tearing down {} tracked operations", self.created.len());
        self.created.teardown(&self.api)
    }
}

impl<A: OperationsApi, C: Clock> Drop for TestEnvironment<A, C> {
    fn drop(&mut self) {
        if !self.created.is_empty() {
            let report = self.teardown();
            log::debug!("Teardown on drop: {report:?}");
        }
    }
}
