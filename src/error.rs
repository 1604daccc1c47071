use thiserror::Error;
use uuid::Uuid;

use crate::operations::ErrorDetail;

/// Main error type for awaiting a condition or a remote operation
#[derive(Debug, Error)]
pub enum AwaitError<T> {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError<T>),

    #[error("Operation {id} failed: {error}")]
    Operation {
        id: Uuid,
        #[source]
        error: ErrorDetail,
    },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl<T> AwaitError<T> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AwaitError::Timeout(_))
    }

    /// Value observed by the last poll attempt, when the deadline ran out.
    pub fn last_value(&self) -> Option<&T> {
        match self {
            AwaitError::Timeout(timeout) => Some(&timeout.last_value),
            _ => None,
        }
    }

    /// Remote-reported error of an operation that ended in failure.
    pub fn operation_error(&self) -> Option<&ErrorDetail> {
        match self {
            AwaitError::Operation { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Missing or unusable poll configuration, detected before any waiting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no value updater set, call repeat_action or repeat_modification")]
    MissingUpdater,

    #[error("no condition set, call one of the until/while setters")]
    MissingCondition,

    #[error("repeat_modification needs an initial value to modify")]
    MissingInitialValue,

    #[error("retry interval must be greater than zero")]
    ZeroRetryInterval,

    #[error("timeout of {0:?} does not yield a representable deadline")]
    DeadlineOutOfRange(std::time::Duration),
}

/// Deadline elapsed without the condition becoming true
#[derive(Debug, Error)]
#[error("Timeout while awaiting {description}. {expected} Current value is {last_value:?}.")]
pub struct TimeoutError<T> {
    pub description: String,
    pub expected: String,
    pub last_value: T,
}
