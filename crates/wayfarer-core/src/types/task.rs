//! Task type definitions
//!
//! A Task tracks one request's lifecycle from entry to answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskRequest;

/// Strongly-typed Task ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Failure classification reported alongside a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailureKind {
    /// The request could not be turned into a valid plan.
    Planning,
    /// A tool was misregistered or invoked against its schema.
    ToolInvocation,
    /// A tool ran and failed, retries included.
    ToolExecution,
    /// The context store rejected a read or write.
    Context,
    /// The task was cancelled between steps.
    Cancelled,
}

impl fmt::Display for TaskFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Planning => "planning",
            Self::ToolInvocation => "tool_invocation",
            Self::ToolExecution => "tool_execution",
            Self::Context => "context",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Task lifecycle states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// Accepted, not yet planned.
    Pending,
    /// The TAO loop is executing steps.
    Running,
    /// All steps executed and the answer synthesized.
    Succeeded,
    /// Terminal failure.
    Failed {
        kind: TaskFailureKind,
        reason: String,
    },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// One user request and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub request: TaskRequest,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(request: TaskRequest) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            request,
            state: TaskState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to a new state, touching `updated_at`.
    pub fn set_state(&mut self, state: TaskState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
