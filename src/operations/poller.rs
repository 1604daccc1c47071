use std::time::Duration;

use uuid::Uuid;

use super::{ErrorDetail, Operation, OperationStatus, OperationsApi};
use crate::clock::Clock;
use crate::config::AwaitConfig;
use crate::error::{AwaitError, ConfigError, TimeoutError};

/// Upper bound on how long an operation may stay RUNNING
pub const DEFAULT_OPERATION_HARD_CAP: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

const STILL_RUNNING_EXPECTATION: &str = "Expected operation to leave RUNNING.";

/// Poll an operation until it leaves RUNNING.
///
/// The status is fetched immediately, then again after every `poll_interval`
/// for as long as the operation is RUNNING and the hard cap has not been
/// reached. The last sleep may end past the cap; its fetch still counts.
///
/// Returns the terminal operation when it COMPLETED. A FAILED operation is
/// reported as [`AwaitError::Operation`] as soon as it is observed, and an
/// operation still RUNNING once `hard_cap` has elapsed as
/// [`AwaitError::Timeout`]. Status fetch failures are returned immediately.
pub fn poll_operation<A>(
    api: &A,
    clock: &dyn Clock,
    id: Uuid,
    hard_cap: Duration,
    poll_interval: Duration,
) -> Result<Operation, AwaitError<Operation>>
where
    A: OperationsApi + ?Sized,
{
    if poll_interval.is_zero() {
        return Err(ConfigError::ZeroRetryInterval.into());
    }
    let deadline = clock
        .now()
        .checked_add(hard_cap)
        .ok_or(ConfigError::DeadlineOutOfRange(hard_cap))?;

    log::debug!("Polling operation {id} every {poll_interval:?} for at most {hard_cap:?}");

    let mut operation = api.fetch_status(id)?;
    let mut fetches = 1usize;
    while operation.is_running() && clock.now() < deadline {
        log::trace!("Operation {id} still running, checking again in {poll_interval:?}");
        clock.sleep(poll_interval);
        operation = api.fetch_status(id)?;
        fetches += 1;
    }

    match operation.status {
        OperationStatus::Running => {
            log::warn!("Operation {id} still running after {fetches} status checks");
            Err(TimeoutError {
                description: format!("operation {id}"),
                expected: STILL_RUNNING_EXPECTATION.to_string(),
                last_value: operation,
            }
            .into())
        }
        OperationStatus::Failed => {
            let error = operation.error.unwrap_or_else(ErrorDetail::unknown);
            log::warn!("Operation {id} failed: {error}");
            Err(AwaitError::Operation { id, error })
        }
        OperationStatus::Completed => {
            log::info!("Operation {id} completed");
            Ok(operation)
        }
    }
}

/// Operation poller bound to one API client and clock
pub struct OperationPoller<'a, A: ?Sized> {
    api: &'a A,
    clock: &'a dyn Clock,
    hard_cap: Duration,
    poll_interval: Duration,
}

impl<'a, A> OperationPoller<'a, A>
where
    A: OperationsApi + ?Sized,
{
    pub fn new(api: &'a A, clock: &'a dyn Clock) -> Self {
        Self {
            api,
            clock,
            hard_cap: DEFAULT_OPERATION_HARD_CAP,
            poll_interval: DEFAULT_OPERATION_POLL_INTERVAL,
        }
    }

    pub fn from_config(api: &'a A, clock: &'a dyn Clock, config: &AwaitConfig) -> Self {
        Self::new(api, clock)
            .with_hard_cap(config.operation_hard_cap())
            .with_poll_interval(config.operation_poll_interval())
    }

    pub fn with_hard_cap(mut self, hard_cap: Duration) -> Self {
        self.hard_cap = hard_cap;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn hard_cap(&self) -> Duration {
        self.hard_cap
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poll(&self, id: Uuid) -> Result<Operation, AwaitError<Operation>> {
        poll_operation(self.api, self.clock, id, self.hard_cap, self.poll_interval)
    }

    /// Wait for the operation, then fetch its result.
    ///
    /// A terminal operation that still carries an error is treated as failed
    /// even when its status says COMPLETED.
    pub fn result_after_operation(&self, id: Uuid) -> Result<A::Output, AwaitError<Operation>> {
        let operation = self.poll(id)?;
        if let Some(error) = operation.error {
            log::warn!("Operation {id} finished with error: {error}");
            return Err(AwaitError::Operation { id, error });
        }

        let result = self.api.fetch_result(id)?;
        Ok(result)
    }
}
