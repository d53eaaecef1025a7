//! Tool registry
//!
//! Process-wide catalog of tools. Owns input validation against the declared
//! schema, the per-invocation timeout, and normalization of collaborator
//! outcomes into observation values.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::tool::{Tool, ToolDescriptor, ToolInputs, ToolOutput};
use crate::types::ObservationValue;

/// Registration and schema errors. Fatal for the task; runtime failures of
/// the tool itself never surface here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
    #[error("tool '{0}' is not registered")]
    UnknownTool(String),
    #[error("invalid input for tool '{tool}': {reason}")]
    InvalidInput { tool: String, reason: String },
}

/// Name to tool catalog, built once at startup and read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, for stable listings.
    order: Vec<String>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. At most one registration per name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.descriptor().name;
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.descriptor())
            .collect()
    }

    /// Invoke a tool with validated inputs under a bounded timeout.
    ///
    /// Collaborator failures and timeouts come back as error-tagged
    /// observation values; only unknown names and schema violations are
    /// registry errors.
    pub async fn invoke(
        &self,
        name: &str,
        inputs: &ToolInputs,
        default_timeout: Duration,
    ) -> Result<ObservationValue, RegistryError> {
        let tool = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;
        let descriptor = tool.descriptor();
        validate_inputs(&descriptor, inputs)?;

        let timeout = descriptor
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);

        let value = match tokio::time::timeout(timeout, tool.execute(inputs)).await {
            Ok(Ok(ToolOutput::Value(value))) => ObservationValue::Success { value },
            Ok(Ok(ToolOutput::Empty)) => ObservationValue::Empty,
            Ok(Err(failure)) => ObservationValue::Error {
                message: failure.message,
                transient: failure.transient,
            },
            Err(_) => ObservationValue::transient_error(format!(
                "tool '{}' timed out after {}ms",
                name,
                timeout.as_millis()
            )),
        };
        Ok(value)
    }
}

fn validate_inputs(descriptor: &ToolDescriptor, inputs: &ToolInputs) -> Result<(), RegistryError> {
    for field in &descriptor.inputs {
        let value = inputs.get(&field.name).filter(|value| !value.is_null());
        match value {
            None if field.required => {
                return Err(RegistryError::InvalidInput {
                    tool: descriptor.name.clone(),
                    reason: format!("missing required field '{}'", field.name),
                });
            }
            Some(value) if !field.field_type.admits(value) => {
                return Err(RegistryError::InvalidInput {
                    tool: descriptor.name.clone(),
                    reason: format!(
                        "field '{}' expects {}, got {}",
                        field.name,
                        field.field_type,
                        json_type_name(value)
                    ),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
