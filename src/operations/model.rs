use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of a remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Running,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OperationStatus::Running)
    }
}

/// Status snapshot of a remote long-running operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn running(id: Uuid) -> Self {
        Self {
            id,
            status: OperationStatus::Running,
            error: None,
            start_time: Some(Utc::now()),
        }
    }

    pub fn completed(id: Uuid) -> Self {
        Self {
            status: OperationStatus::Completed,
            ..Self::running(id)
        }
    }

    pub fn failed(id: Uuid, error: ErrorDetail) -> Self {
        Self {
            status: OperationStatus::Failed,
            error: Some(error),
            ..Self::running(id)
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == OperationStatus::Running
    }

    /// Parse an operation as reported by the remote service.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Error payload reported by the remote service for a failed operation
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// Stand-in for a failure the service did not describe.
    pub fn unknown() -> Self {
        Self::new("UNKNOWN", "operation failed without an error description")
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
