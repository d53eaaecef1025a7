//! Request type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw user request, as handed to the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// The request exactly as the user wrote it.
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl TaskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

impl From<&str> for TaskRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Closed set of request capabilities the planner recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Current weather at the destination.
    Weather,
    /// Tourist attractions at the destination.
    Attractions,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weather => f.write_str("weather"),
            Self::Attractions => f.write_str("attractions"),
        }
    }
}
