//! Blocking condition awaiter.
//!
//! A [`PollConfiguration`] repeatedly refreshes a value and tests it against a
//! [`Condition`] until the condition holds or the deadline passes. Time and
//! sleeping go through a [`Clock`] so tests can run on virtual time.

pub mod builder;
pub mod conditions;

pub use builder::PollConfigurationBuilder;
pub use conditions::{Condition, HasSize};

use std::fmt::{self, Debug};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::{AwaitError, ConfigError, TimeoutError};

pub const DEFAULT_DESCRIPTION: &str = "some condition";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Reusable timing and naming part of a poll configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub description: String,
    pub timeout: Duration,
    pub retry_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

type Action<'a, T> = Box<dyn FnMut() -> anyhow::Result<T> + Send + 'a>;
type Modification<'a, T> = Box<dyn FnMut(&mut T) -> anyhow::Result<()> + Send + 'a>;

/// How the polled value is refreshed between condition checks
pub(crate) enum Updater<'a, T> {
    /// Fetch a fresh value, ignoring the previous one
    Action(Action<'a, T>),
    /// Modify the previous value in place
    Modification(Modification<'a, T>),
}

impl<T> Updater<'_, T> {
    fn apply(&mut self, current: Option<T>) -> Result<T, AwaitError<T>> {
        match self {
            Updater::Action(action) => Ok(action()?),
            Updater::Modification(modify) => {
                let mut value = current.ok_or(ConfigError::MissingInitialValue)?;
                modify(&mut value)?;
                Ok(value)
            }
        }
    }

    fn needs_initial_value(&self) -> bool {
        matches!(self, Updater::Modification(_))
    }
}

/// Validated, single-use description of one poll
pub struct PollConfiguration<'a, T> {
    initial_value: Option<T>,
    updater: Updater<'a, T>,
    condition: Condition<'a, T>,
    settings: PollSettings,
}

impl<'a, T> PollConfiguration<'a, T> {
    pub fn builder() -> PollConfigurationBuilder<'a, T> {
        PollConfigurationBuilder::new()
    }

    pub fn for_initial_value(initial_value: T) -> PollConfigurationBuilder<'a, T> {
        PollConfigurationBuilder::new().with_initial_value(initial_value)
    }

    pub fn description(&self) -> &str {
        &self.settings.description
    }

    pub fn expected(&self) -> &str {
        self.condition.expected()
    }

    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    pub fn retry_interval(&self) -> Duration {
        self.settings.retry_interval
    }
}

impl<T: Debug> PollConfiguration<'_, T> {
    /// Block on the wall clock until the condition holds.
    pub fn await_value(self) -> Result<T, AwaitError<T>> {
        await_condition(self, &SystemClock)
    }

    pub fn await_with(self, clock: &dyn Clock) -> Result<T, AwaitError<T>> {
        await_condition(self, clock)
    }
}

impl<T> Debug for PollConfiguration<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollConfiguration")
            .field("settings", &self.settings)
            .field("expected", &self.condition.expected())
            .field("has_initial_value", &self.initial_value.is_some())
            .finish_non_exhaustive()
    }
}

/// Refresh the value and test the condition until it holds or time runs out.
///
/// The first update happens immediately. Before each sleep the loop checks
/// that a full retry interval still fits before the deadline; after waking it
/// re-checks the deadline, so a late wake-up can buy one extra attempt.
/// Updater failures are returned as-is without retrying.
pub fn await_condition<T: Debug>(
    config: PollConfiguration<'_, T>,
    clock: &dyn Clock,
) -> Result<T, AwaitError<T>> {
    let PollConfiguration {
        initial_value,
        mut updater,
        condition,
        settings,
    } = config;

    log::debug!("Awaiting {}: {}", settings.description, condition.expected());
    let deadline = clock
        .now()
        .checked_add(settings.timeout)
        .ok_or(ConfigError::DeadlineOutOfRange(settings.timeout))?;

    let mut value = initial_value;
    let mut attempt = 0usize;
    let last_value = loop {
        attempt += 1;
        let current = updater.apply(value.take())?;
        if condition.is_met(&current) {
            log::debug!("Success: value is now {current:?} (attempt {attempt})");
            return Ok(current);
        }

        let fits_before_deadline = clock
            .now()
            .checked_add(settings.retry_interval)
            .is_some_and(|wake_up| wake_up <= deadline);
        if !fits_before_deadline {
            break current;
        }

        log::trace!(
            "Attempt {attempt} for {} not satisfied, retrying in {:?}",
            settings.description,
            settings.retry_interval
        );
        clock.sleep(settings.retry_interval);
        if clock.now() > deadline {
            break current;
        }
        value = Some(current);
    };

    log::warn!(
        "Gave up awaiting {} after {attempt} attempt(s), last value {last_value:?}",
        settings.description
    );
    Err(TimeoutError {
        description: settings.description,
        expected: condition.expected().to_string(),
        last_value,
    }
    .into())
}
