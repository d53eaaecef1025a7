//! Context store
//!
//! Insertion-ordered, write-once record of the observations produced during
//! one task run. Scoped to exactly one task; later steps and the synthesizer
//! read from it, nothing ever overwrites an entry.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::tool::ToolInputs;
use crate::types::{InputValue, Observation, StepInput};

/// Store access errors. All of them indicate a planning or sequencing bug
/// and are fatal for the task.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    #[error("context key '{0}' already holds an observation")]
    DuplicateKey(String),
    #[error("context key '{0}' not found")]
    MissingKey(String),
    #[error("input '{input}' references '{key}': {reason}")]
    UnresolvedReference {
        input: String,
        key: String,
        reason: String,
    },
}

/// Per-task observation record. Keys are write-once; iteration follows
/// insertion order.
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: HashMap<String, Observation>,
    order: Vec<String>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation under `key`. Existing keys are never replaced.
    pub fn put(
        &mut self,
        key: impl Into<String>,
        observation: Observation,
    ) -> Result<(), ContextError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(ContextError::DuplicateKey(key));
        }
        self.order.push(key.clone());
        self.entries.insert(key, observation);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&Observation, ContextError> {
        self.entries
            .get(key)
            .ok_or_else(|| ContextError::MissingKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Observation)> {
        self.order.iter().filter_map(|key| {
            self.entries
                .get(key)
                .map(|observation| (key.as_str(), observation))
        })
    }

    /// Substitute every reference in a step's input template with the
    /// referenced observation's payload.
    pub fn resolve(&self, inputs: &[StepInput]) -> Result<ToolInputs, ContextError> {
        let mut resolved = ToolInputs::new();
        for input in inputs {
            let value = match &input.value {
                InputValue::Literal { value } => value.clone(),
                InputValue::Reference { step, field } => {
                    self.resolve_reference(&input.name, step.as_str(), field.as_deref())?
                }
            };
            resolved.insert(input.name.clone(), value);
        }
        Ok(resolved)
    }

    fn resolve_reference(
        &self,
        input: &str,
        key: &str,
        field: Option<&str>,
    ) -> Result<Value, ContextError> {
        let unresolved = |reason: String| ContextError::UnresolvedReference {
            input: input.to_string(),
            key: key.to_string(),
            reason,
        };
        let observation = self
            .entries
            .get(key)
            .ok_or_else(|| unresolved("no recorded observation".to_string()))?;
        let payload = observation
            .value
            .payload()
            .ok_or_else(|| unresolved("observation holds no payload".to_string()))?;
        match field {
            None => Ok(payload.clone()),
            Some(name) => payload
                .get(name)
                .cloned()
                .ok_or_else(|| unresolved(format!("payload has no field '{name}'"))),
        }
    }
}
