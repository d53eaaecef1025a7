//! Observation type definitions
//!
//! An Observation is the normalized, immutable record of one tool
//! invocation's outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StepId;

/// Tagged outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ObservationValue {
    /// The tool ran and produced a payload.
    Success { value: Value },
    /// The tool ran and found nothing.
    Empty,
    /// The tool failed or timed out.
    Error { message: String, transient: bool },
}

impl ObservationValue {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    /// Failure no retry will fix.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            transient: false,
        }
    }

    /// Failure worth retrying.
    pub fn transient_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            transient: true,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_transient_error(&self) -> bool {
        matches!(self, Self::Error { transient: true, .. })
    }

    /// The success payload, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { value } => Some(value),
            _ => None,
        }
    }
}

/// The recorded result of executing one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Step that produced this observation.
    pub step_id: StepId,
    /// Normalized outcome.
    pub value: ObservationValue,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(step_id: impl Into<StepId>, value: ObservationValue) -> Self {
        Self {
            step_id: step_id.into(),
            value,
            recorded_at: Utc::now(),
        }
    }
}
