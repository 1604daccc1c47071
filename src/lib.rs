//! # routeopt-await
//!
//! Blocking condition awaiting and long-running operation polling for
//! route-optimization test suites.
//!
//! A [`PollConfiguration`] refreshes a value until a [`Condition`] holds or a
//! timeout passes; [`OperationPoller`] builds on it to wait for remote
//! operations and fetch their results. All waiting goes through a [`Clock`].

pub mod awaiter;
pub mod clock;
pub mod config;
pub mod error;
pub mod operations;

#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

// Re-export main public API
pub use awaiter::{
    await_condition, conditions, Condition, HasSize, PollConfiguration, PollConfigurationBuilder,
    PollSettings,
};
pub use clock::{Clock, SimulatedClock, SystemClock};
pub use config::{create_sample_config, load_config, AwaitConfig};
pub use error::{AwaitError, ConfigError, TimeoutError};
pub use operations::{
    poll_operation, CreatedOperations, ErrorDetail, Operation, OperationPoller, OperationStatus,
    OperationsApi, TeardownReport,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
