use std::fmt::Debug;
use std::time::Duration;

use super::conditions::{self, Condition, HasSize};
use super::{await_condition, PollConfiguration, PollSettings, Updater};
use crate::clock::{Clock, SystemClock};
use crate::error::{AwaitError, ConfigError};

/// Fluent builder for a [`PollConfiguration`]
///
/// Exactly one updater (`repeat_action` or `repeat_modification`) and one
/// condition (`until*` / `while*`) must be set; a later call replaces an
/// earlier one.
pub struct PollConfigurationBuilder<'a, T> {
    initial_value: Option<T>,
    updater: Option<Updater<'a, T>>,
    condition: Option<Condition<'a, T>>,
    settings: PollSettings,
}

impl<T> Default for PollConfigurationBuilder<'_, T> {
    fn default() -> Self {
        Self {
            initial_value: None,
            updater: None,
            condition: None,
            settings: PollSettings::default(),
        }
    }
}

impl<'a, T> PollConfigurationBuilder<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.settings.retry_interval = retry_interval;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.settings.description = description.into();
        self
    }

    /// Replace description, timeout and retry interval at once.
    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_initial_value(mut self, initial_value: T) -> Self {
        self.initial_value = Some(initial_value);
        self
    }

    /// Produce a fresh value on every attempt; the previous value is dropped.
    pub fn repeat_action<F>(mut self, action: F) -> Self
    where
        F: FnMut() -> anyhow::Result<T> + Send + 'a,
    {
        self.updater = Some(Updater::Action(Box::new(action)));
        self
    }

    /// Modify the current value in place on every attempt.
    ///
    /// Requires [`with_initial_value`](Self::with_initial_value).
    pub fn repeat_modification<F>(mut self, modification: F) -> Self
    where
        F: FnMut(&mut T) -> anyhow::Result<()> + Send + 'a,
    {
        self.updater = Some(Updater::Modification(Box::new(modification)));
        self
    }

    pub fn until(mut self, condition: Condition<'a, T>) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn until_condition<F>(self, name: &str, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + 'a,
    {
        self.until(conditions::named(name, predicate))
    }

    pub fn until_value_equals(self, expected: T) -> Self
    where
        T: PartialEq + Debug + Send + 'a,
    {
        self.until(conditions::value_equals(expected))
    }

    pub fn until_value_reaches(self, threshold: T) -> Self
    where
        T: PartialOrd + Debug + Send + 'a,
    {
        self.until(conditions::value_reaches(threshold))
    }

    pub fn until_value_has_size(self, size: usize) -> Self
    where
        T: HasSize + 'a,
    {
        self.until(conditions::has_size(size))
    }

    /// Keep polling as long as the value equals `unexpected`.
    pub fn while_value_equals(self, unexpected: T) -> Self
    where
        T: PartialEq + Debug + Send + 'a,
    {
        self.until(conditions::value_not_equal(unexpected))
    }

    /// Validate and turn the builder into a single-use configuration.
    ///
    /// The builder is consumed since updaters are boxed `FnMut` closures and
    /// cannot be cloned. To share description and timing between several
    /// configurations, pass the same [`PollSettings`] to
    /// [`with_settings`](Self::with_settings) on each builder.
    pub fn build(self) -> Result<PollConfiguration<'a, T>, ConfigError> {
        let updater = self.updater.ok_or(ConfigError::MissingUpdater)?;
        let condition = self.condition.ok_or(ConfigError::MissingCondition)?;
        if updater.needs_initial_value() && self.initial_value.is_none() {
            return Err(ConfigError::MissingInitialValue);
        }
        if self.settings.retry_interval.is_zero() {
            return Err(ConfigError::ZeroRetryInterval);
        }

        if self.settings.retry_interval > self.settings.timeout {
            log::debug!(
                "Retry interval {:?} exceeds timeout {:?} for {}, no retries will happen",
                self.settings.retry_interval,
                self.settings.timeout,
                self.settings.description
            );
        }

        Ok(PollConfiguration {
            initial_value: self.initial_value,
            updater,
            condition,
            settings: self.settings,
        })
    }
}

impl<T: Debug> PollConfigurationBuilder<'_, T> {
    pub fn await_value(self) -> Result<T, AwaitError<T>> {
        self.await_with(&SystemClock)
    }

    pub fn await_with(self, clock: &dyn Clock) -> Result<T, AwaitError<T>> {
        await_condition(self.build()?, clock)
    }

    pub fn await_described(
        self,
        description: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<T, AwaitError<T>> {
        self.with_description(description).await_with(clock)
    }
}
