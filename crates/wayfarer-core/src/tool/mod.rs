//! Tool abstraction
//!
//! A Tool wraps one external capability behind a uniform async contract the
//! registry can validate and time-bound. Implementations live in
//! collaborator crates; the core never performs I/O itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Concrete inputs for one invocation, fully resolved.
pub type ToolInputs = Map<String, Value>;

/// Declared type of a tool input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
}

impl FieldType {
    /// Whether a JSON value inhabits this type.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
        };
        f.write_str(label)
    }
}

/// One declared input field on a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl InputField {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }
}

/// Static description of a tool: its name, input schema, and invocation
/// limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Declared input fields; undeclared inputs pass through unvalidated.
    #[serde(default)]
    pub inputs: Vec<InputField>,
    /// Per-tool override of the registry's invocation timeout, in
    /// milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Per-tool override of the engine's attempt budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            inputs: Vec::new(),
            timeout_ms: None,
            max_attempts: None,
        }
    }

    pub fn with_input(mut self, field: InputField) -> Self {
        self.inputs.push(field);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// What a tool produced when it ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Structured result payload.
    Value(Value),
    /// The tool ran but found nothing.
    Empty,
}

/// A failure raised by a tool collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ToolFailure {
    pub message: String,
    /// Whether a retry could plausibly succeed.
    pub transient: bool,
}

impl ToolFailure {
    /// Failure worth retrying (timeouts, flaky upstreams).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    /// Failure no retry will fix.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

/// An external capability invocable through the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static description; the registry validates inputs against it.
    fn descriptor(&self) -> ToolDescriptor;

    /// Perform the lookup. The registry bounds this call with a timeout, so
    /// implementations do not need their own deadline handling.
    async fn execute(&self, inputs: &ToolInputs) -> Result<ToolOutput, ToolFailure>;
}
