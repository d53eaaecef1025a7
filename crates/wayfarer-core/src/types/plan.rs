//! Plan type definitions
//!
//! A Plan is the ordered step sequence the engine executes for one task.

use serde::{Deserialize, Serialize};

use super::{Step, StepId};

/// Ordered sequence of steps for one task. Consumed immutably by the engine;
/// mid-run revisions go through [`PlanDelta`], never through mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// What the plan is trying to accomplish, usually the raw request text.
    pub goal: String,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            goal: goal.into(),
            steps,
        }
    }

    pub fn get_step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|step| &step.id == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// What a replan consult decided about the not-yet-executed steps.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanDelta {
    /// The remaining steps still apply.
    Unchanged,
    /// Drop every remaining step and run these instead.
    ReplaceSuffix(Vec<Step>),
    /// Keep the remaining steps and run these after them.
    Append(Vec<Step>),
}

impl PlanDelta {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_step_finds_by_id() {
        let plan = Plan::new(
            "weather in Beijing",
            vec![Step::invoke("get_weather", "get_weather")],
        );
        assert_eq!(plan.len(), 1);
        assert!(plan.get_step(&StepId::from("get_weather")).is_some());
        assert!(plan.get_step(&StepId::from("missing")).is_none());
    }
}
