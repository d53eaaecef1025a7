//! Step type definitions
//!
//! A Step is one planned tool invocation in a Plan.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Strongly-typed Step ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StepId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&StepId> for StepId {
    fn from(value: &StepId) -> Self {
        value.clone()
    }
}

impl From<StepId> for String {
    fn from(value: StepId) -> Self {
        value.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// One value in a step's input template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputValue {
    /// A value fixed at planning time.
    Literal { value: Value },
    /// The payload of an earlier step's observation, optionally narrowed to
    /// one field.
    Reference {
        step: StepId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

/// A named input slot on a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub name: String,
    pub value: InputValue,
}

impl StepInput {
    /// Input with a value known at planning time.
    pub fn literal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: InputValue::Literal {
                value: value.into(),
            },
        }
    }

    /// Input fed from the whole payload of an earlier observation.
    pub fn reference(name: impl Into<String>, step: impl Into<StepId>) -> Self {
        Self {
            name: name.into(),
            value: InputValue::Reference {
                step: step.into(),
                field: None,
            },
        }
    }

    /// Input fed from one field of an earlier observation's payload.
    pub fn reference_field(
        name: impl Into<String>,
        step: impl Into<StepId>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: InputValue::Reference {
                step: step.into(),
                field: Some(field.into()),
            },
        }
    }
}

/// A single step in the execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier for this step within its plan.
    pub id: StepId,
    /// Name of the registered tool to invoke.
    pub tool: String,
    /// Input template, resolved against the context store right before
    /// invocation.
    #[serde(default)]
    pub inputs: Vec<StepInput>,
    /// IDs of steps this step depends on, beyond what its references imply.
    #[serde(default)]
    pub depends_on: Vec<StepId>,
}

impl Step {
    /// Create a step invoking the named tool.
    pub fn invoke(id: impl Into<StepId>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            inputs: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Add an input slot.
    pub fn with_input(mut self, input: StepInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add explicit dependencies.
    pub fn with_depends_on(mut self, deps: Vec<StepId>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Step ids this step's inputs reference.
    pub fn referenced_steps(&self) -> impl Iterator<Item = &StepId> {
        self.inputs.iter().filter_map(|input| match &input.value {
            InputValue::Reference { step, .. } => Some(step),
            InputValue::Literal { .. } => None,
        })
    }

    /// Declared dependencies plus referenced steps, deduplicated.
    pub fn dependencies(&self) -> Vec<StepId> {
        let mut deps = self.depends_on.clone();
        for step in self.referenced_steps() {
            if !deps.contains(step) {
                deps.push(step.clone());
            }
        }
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_id_compares_with_str() {
        let id = StepId::from("get_weather");
        assert_eq!(id, "get_weather");
        assert_eq!(id.to_string(), "get_weather");
        assert_eq!(id.as_str(), "get_weather");
    }

    #[test]
    fn test_dependencies_merge_declared_and_referenced() {
        let step = Step::invoke("s2", "match_attractions")
            .with_input(StepInput::literal("city", json!("Beijing")))
            .with_input(StepInput::reference_field("weather", "s1", "condition"))
            .with_depends_on(vec![StepId::from("s0")]);

        let deps = step.dependencies();
        assert_eq!(deps, vec![StepId::from("s0"), StepId::from("s1")]);
    }

    #[test]
    fn test_dependencies_do_not_repeat_referenced_steps() {
        let step = Step::invoke("s2", "match_attractions")
            .with_input(StepInput::reference_field("weather", "s1", "condition"))
            .with_depends_on(vec![StepId::from("s1")]);

        assert_eq!(step.dependencies(), vec![StepId::from("s1")]);
    }

    #[test]
    fn test_input_value_serializes_with_kind_tag() {
        let input = StepInput::reference_field("weather", "get_weather", "condition");
        let encoded = serde_json::to_value(&input).unwrap();
        assert_eq!(encoded["value"]["kind"], "reference");
        assert_eq!(encoded["value"]["step"], "get_weather");
        assert_eq!(encoded["value"]["field"], "condition");
    }
}
