//! Polling of remote long-running operations.

pub mod cleanup;
pub mod model;
pub mod poller;

pub use cleanup::{CreatedOperations, TeardownReport};
pub use model::{ErrorDetail, Operation, OperationStatus};
pub use poller::{
    poll_operation, OperationPoller, DEFAULT_OPERATION_HARD_CAP, DEFAULT_OPERATION_POLL_INTERVAL,
};

use uuid::Uuid;

/// Remote operations endpoint the poller talks to.
///
/// Implementations wrap the generated service client; every call is blocking
/// and reports transport or protocol failures as `anyhow::Error`.
pub trait OperationsApi: Send + Sync {
    /// Final result object of a completed operation (e.g. an optimized plan)
    type Output;

    fn fetch_status(&self, id: Uuid) -> anyhow::Result<Operation>;

    fn fetch_result(&self, id: Uuid) -> anyhow::Result<Self::Output>;

    /// Ask the service to stop a running operation. Best-effort.
    fn cancel(&self, id: Uuid) -> anyhow::Result<()>;

    /// Remove the resource the operation ran on.
    fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}
